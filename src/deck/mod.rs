//! Deck geometry: definitions and pure resolution.
//!
//! A deck definition is a versioned, immutable description of the physical
//! deck: its cutouts (fixed slot locations), the cutout fixtures that can
//! occupy them (trash bins, staging areas, module adapters), and the
//! addressable areas those fixtures provide. Definitions are loaded from
//! JSON produced by the definition tooling and treated as validated input;
//! a malformed definition is a configuration error at load time.
//!
//! The [`resolver`] submodule contains the pure functions that map area
//! names to owning cutouts, candidate fixtures, and absolute positions.
//! Which fixture is *actually* installed on a cutout is not decided here;
//! that lives in the deck-configuration state store.

pub mod definition;
pub mod resolver;

pub use definition::{
    AddressableArea, AddressableAreaSpec, BoundingBox, Cutout, CutoutFixture, DeckDefinition,
    DeckPoint, Dimensions, OffsetVector,
};
pub use resolver::PotentialCutoutFixture;
