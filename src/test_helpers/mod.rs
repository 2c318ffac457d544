// Test Helpers Module
//
// In-memory remote used by unit tests, integration tests and the simulation
// binary. Compiled into the library so all of them share one implementation.

pub mod mock_remote;

pub use mock_remote::{MockCall, MockOperation, MockRemote};
