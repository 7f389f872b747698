//! Integration tests for Parley. Everything runs against a mockito backend.


#[cfg(test)]
mod unit;
