// Authentication helpers (token verification only)

pub mod jwt;
