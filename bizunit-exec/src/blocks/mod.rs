//! The built-in block catalog, one family per `type`.

pub mod arraylist;
pub mod codec;
pub mod datetime;
pub mod driver;
pub mod flow;
pub mod oauth2;
pub mod operator;
pub mod primitive;
pub mod protocol;
pub mod reference;
mod support;

use bizunit_core::BlockFactory;

pub use datetime::DateTimeSupport;
pub use operator::{REQUEST_STORAGE, RESPONSE_STORAGE, RESTFUL_STORAGE};

/// Adds every built-in family to `factory`. Families registered earlier under the same type
/// are replaced.
pub fn register_all(factory: &mut BlockFactory) {
    factory.register(operator::family());
    factory.register(protocol::family());
    factory.register(primitive::family());
    factory.register(reference::family());
    factory.register(flow::family());
    factory.register(arraylist::family());
    factory.register(datetime::family());
    factory.register(codec::family());
    factory.register(driver::family());
    factory.register(oauth2::family());
}

pub fn default_factory() -> BlockFactory {
    let mut factory = BlockFactory::new();
    register_all(&mut factory);
    factory
}
