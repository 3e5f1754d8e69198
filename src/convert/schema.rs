//! Output schema shared by the chunk producer and the parquet writer.

use polars::prelude::{DataType, PlSmallStr, Schema};

use crate::constants::columns::{BLOCK, SCENARIO, STAGE};
use crate::error::{GrafError, Result};

/// Derive the output schema from an agent list: three int64 key columns
/// followed by one float32 column per agent, in storage order.
///
/// Agent names must be unique and must not shadow the key columns, or
/// the resulting file could not round-trip by column name.
pub fn output_schema(agents: &[String]) -> Result<Schema> {
    let mut schema = Schema::with_capacity(agents.len() + 3);
    schema.with_column(PlSmallStr::from_static(STAGE), DataType::Int64);
    schema.with_column(PlSmallStr::from_static(SCENARIO), DataType::Int64);
    schema.with_column(PlSmallStr::from_static(BLOCK), DataType::Int64);
    for agent in agents {
        if schema
            .with_column(agent.as_str().into(), DataType::Float32)
            .is_some()
        {
            return Err(GrafError::configuration(format!(
                "duplicate output column '{}' in agent list",
                agent
            )));
        }
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_schema_layout() {
        let schema = output_schema(&agents(&["Thermal 1", "Hydro 1"])).unwrap();
        let names: Vec<&str> = schema.iter_names().map(|name| name.as_str()).collect();
        assert_eq!(names, ["stage", "scenario", "block", "Thermal 1", "Hydro 1"]);
        assert_eq!(schema.get("stage"), Some(&DataType::Int64));
        assert_eq!(schema.get("Hydro 1"), Some(&DataType::Float32));
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let err = output_schema(&agents(&["A", "B", "A"])).unwrap_err();
        assert!(err.to_string().contains("duplicate output column 'A'"));
    }

    #[test]
    fn test_agent_shadowing_key_column_rejected() {
        assert!(output_schema(&agents(&["stage"])).is_err());
    }

    #[test]
    fn test_agentless_schema() {
        let schema = output_schema(&[]).unwrap();
        assert_eq!(schema.len(), 3);
    }
}
