//! Shared fixtures and tests for the TIFF module
