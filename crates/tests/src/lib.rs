//! Cross-crate integration tests for the Cadenza effects chain

#[cfg(test)]
mod chain_integration;

#[cfg(test)]
mod persistence_integration;
