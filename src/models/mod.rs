pub mod free_electron;
pub mod tight_binding;
