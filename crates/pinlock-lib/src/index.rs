//! An in-memory Python package index and the [`Provider`](crate::Provider) that resolves against it.
//!
//! # Usage
//! 1. Build a [`PackageIndex`] with [`PackageIndex::add_release`] or load one with [`PackageIndex::from_json`].
//! 1. Describe the target with an [`Environment`], e.g. [`Environment::python`].
//! 1. Pass an [`IndexProvider`] to a [`Resolver`](crate::Resolver) or [`Locker`](crate::Locker).
//! 1. Wrap it in a [`PinReuseProvider`] when relocking to keep existing pins where possible,
//! or an [`EagerUpgradeProvider`] to upgrade some projects along with everything they depend on.

mod version;
pub use version::Version;
pub use version::PreKind;

pub mod specifier;
pub use specifier::Specifier;
pub use specifier::SpecifierSet;

pub mod marker;
pub use marker::Marker;
pub use marker::Environment;

mod requirement;
pub use requirement::Requirement;
pub use requirement::Candidate;
pub use requirement::normalize_name;

mod package_index;
pub use package_index::PackageIndex;
pub use package_index::Release;

mod provider;
pub use provider::IndexProvider;
pub use provider::PinReuseProvider;
pub use provider::EagerUpgradeProvider;
pub use provider::EXCLUDED_PROJECTS;
