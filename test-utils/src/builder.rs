use crate::{context::TestContext, error::TestError};

/// Builder for creating test contexts with customizable database schemas.
///
/// Provides a fluent interface for configuring test environments with in-memory SQLite
/// databases. Use the builder pattern to request the document store schema, then call
/// `build()` to create the configured test context.
///
/// # Example
///
/// ```rust,ignore
/// use test_utils::builder::TestBuilder;
///
/// let test = TestBuilder::new()
///     .with_document_tables()
///     .build()
///     .await?;
/// ```
pub struct TestBuilder {
    /// Whether to run the application migrations during `build()`.
    migrate: bool,
}

impl TestBuilder {
    /// Creates a new test builder with an empty schema.
    ///
    /// # Returns
    /// - New `TestBuilder` instance
    pub fn new() -> Self {
        Self { migrate: false }
    }

    /// Adds the tables backing the document store.
    ///
    /// Runs the application's migrations rather than deriving the tables from
    /// the entities, so the unique `(collection, doc_key)` index is present
    /// exactly as in production.
    ///
    /// # Returns
    /// - `Self` - Builder instance for method chaining
    pub fn with_document_tables(mut self) -> Self {
        self.migrate = true;
        self
    }

    /// Builds the test context with the configured schema.
    ///
    /// # Returns
    /// - `Ok(TestContext)` - Context with a migrated in-memory database
    /// - `Err(TestError::Database)`- Failed to connect to database or migrate
    pub async fn build(self) -> Result<TestContext, TestError> {
        let mut setup = TestContext::new();

        if self.migrate {
            setup.migrate().await?;
        } else {
            setup.database().await?;
        }

        Ok(setup)
    }
}

impl Default for TestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
