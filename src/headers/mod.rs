//! Reference header catalog.
//!
//! Each protocol here is an instance of the declarative framework in
//! [`crate::header`]: a schema declaration plus its bindings, nothing
//! hand-rolled. The catalog covers the link, network and transport kinds
//! the dissector dispatches between, and the TFTP/MLD families that
//! exercise subkind re-parsing and predicate bindings.

mod eth;
mod icmpv6;
mod ipv4;
mod ipv6;
mod tftp;
mod udp;

use crate::header::Registry;

/// Registers every built-in kind, its bindings, and the link-layer guess
/// order. Called once while initializing [`Registry::builtin`].
pub(crate) fn register_all(registry: &mut Registry) {
    eth::register(registry);
    ipv4::register(registry);
    ipv6::register(registry);
    udp::register(registry);
    tftp::register(registry);
    icmpv6::register(registry);

    for name in ["Eth", "IP", "IPv6"] {
        let id = registry.lookup(name).expect("catalog kind registered above");
        registry.push_guess(id);
    }
}
