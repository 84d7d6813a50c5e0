//! Integration tests for the appsync crate


mod test_packaging;
mod test_signing;
mod test_transport;
