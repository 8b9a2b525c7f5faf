// bridge-test-utils: Shared test utilities for the SMS bridge suite.
//
// Provides an in-process mock vendor gateway and a mock datastore recorder
// for integration testing of the agent's poll/sync pipeline.

pub mod mock_datastore;
pub mod mock_gateway;

pub use mock_datastore::MockDatastore;
pub use mock_gateway::MockGateway;
