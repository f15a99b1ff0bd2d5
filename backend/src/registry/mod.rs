//! Block Registry - explicit registration of transformer blocks and their
//! output tests.
//!
//! An orchestrator looks a block up by name, runs its transformer on the
//! upstream table, then runs every test registered for it. A failing test
//! fails the run.

use std::collections::HashMap;

use crate::api::logs::{log_error, log_info_indent, log_success};
use crate::error::{PipelineResult, RegistryError, RegistryResult, TransformResult, ValidationResult};
use crate::models::{StarSchema, Table};
use crate::transform::star::transform_trips;
use crate::validation::{test_integrity, test_output, test_schema_shape};

/// Name under which the trip star schema transformer is registered.
pub const TRIP_STAR_SCHEMA: &str = "trip_star_schema";

/// A transformer: main upstream table plus any further upstream tables.
pub type TransformerFn = fn(&Table, &[Table]) -> TransformResult<StarSchema>;

/// A test run against a transformer's output.
pub type OutputTestFn = fn(Option<&StarSchema>) -> ValidationResult<()>;

/// A registered block
#[derive(Clone)]
pub struct Block {
    /// Unique name
    pub name: String,
    /// Human-readable description
    pub description: String,
    transformer: TransformerFn,
    tests: Vec<(String, OutputTestFn)>,
}

impl Block {
    /// Names of the tests attached to this block, in run order.
    pub fn test_names(&self) -> Vec<&str> {
        self.tests.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Registry of transformer blocks
#[derive(Default)]
pub struct BlockRegistry {
    blocks: HashMap<String, Block>,
}

impl BlockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the trip star schema block and its tests.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.blocks.insert(
            TRIP_STAR_SCHEMA.to_string(),
            Block {
                name: TRIP_STAR_SCHEMA.to_string(),
                description: "Reshape taxi trips into a fact table and seven dimensions".to_string(),
                transformer: transform_trips,
                tests: vec![
                    ("output_defined".to_string(), test_output as OutputTestFn),
                    ("row_integrity".to_string(), test_integrity as OutputTestFn),
                    ("schema_shape".to_string(), test_schema_shape as OutputTestFn),
                ],
            },
        );
        registry
    }

    /// Register a transformer under `name`.
    pub fn register_transformer(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        transformer: TransformerFn,
    ) -> RegistryResult<()> {
        let name = name.into();
        if self.blocks.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.blocks.insert(
            name.clone(),
            Block {
                name,
                description: description.into(),
                transformer,
                tests: Vec::new(),
            },
        );
        Ok(())
    }

    /// Attach a test to an already registered block.
    pub fn register_test(
        &mut self,
        block: &str,
        test_name: impl Into<String>,
        test: OutputTestFn,
    ) -> RegistryResult<()> {
        let entry = self
            .blocks
            .get_mut(block)
            .ok_or_else(|| RegistryError::NotFound(block.to_string()))?;
        entry.tests.push((test_name.into(), test));
        Ok(())
    }

    /// Get a block by name
    pub fn get(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    /// All blocks, sorted by name
    pub fn list(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.values().collect();
        blocks.sort_by(|a, b| a.name.cmp(&b.name));
        blocks
    }

    fn block(&self, name: &str) -> RegistryResult<&Block> {
        self.blocks
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Run only the transformer of `name`.
    pub fn run_transformer(&self, name: &str, input: &Table, upstream: &[Table]) -> PipelineResult<StarSchema> {
        let block = self.block(name)?;
        Ok((block.transformer)(input, upstream)?)
    }

    /// Run every test attached to `name` against `output`.
    pub fn run_tests(&self, name: &str, output: Option<&StarSchema>) -> PipelineResult<()> {
        let block = self.block(name)?;
        for (test_name, test) in &block.tests {
            if let Err(e) = test(output) {
                log_error(format!("Test '{}' failed: {}", test_name, e));
                return Err(e.into());
            }
            log_info_indent(format!("test '{}' passed", test_name), 1);
        }
        Ok(())
    }

    /// Run the transformer of `name`, then its tests.
    pub fn run(&self, name: &str, input: &Table, upstream: &[Table]) -> PipelineResult<StarSchema> {
        let output = self.run_transformer(name, input, upstream)?;
        self.run_tests(name, Some(&output))?;
        log_success(format!("Block '{}' passed all tests", name));
        Ok(output)
    }
}
