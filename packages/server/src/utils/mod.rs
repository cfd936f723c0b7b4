pub mod hash;
pub mod jwt;
pub mod paginator;
pub mod redirect;
