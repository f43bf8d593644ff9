//! Test modules for werval-http-server crate
