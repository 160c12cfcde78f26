pub mod core;
pub mod store_object;

#[cfg(test)]
mod tests;

pub use self::core::GenericStore;
