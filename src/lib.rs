//! # sb3-scrambler: Identifier Obfuscation for Scratch 3 Projects
//!
//! Renames the user-defined identifiers of a Scratch 3 project (variables,
//! lists, sprites, costumes, sounds, backdrops, custom blocks and their
//! arguments) to generated names while rewriting every reference, so the
//! project keeps running exactly as before.
//!
//! - **Reference closure**: every site naming a renamed symbol is rewritten in
//!   the same pass, resolved by stable ids where the format provides them
//! - **Scoped uniqueness**: replacements are unique per category and scope,
//!   and sprite-local names never shadow global ones
//! - **Pluggable generation**: random hex or random code points from a range
//! - **Optional integer obfuscation**: `"42"` becomes `"0x2a"`
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │             API Layer (obfuscate, ScramblerEngine)           │
//! ├──────────────────────────────────────────────────────────────┤
//! │   Rename              │  Core            │  I/O              │
//! │ • Generator           │ • Manifest view  │ • .sb3 packages   │
//! │ • Walker              │ • Symbol table   │                   │
//! │ • Rewrite pass        │ • Config         │  Transforms       │
//! │ • Signatures          │ • Errors         │ • Integers → hex  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sb3_scrambler::{io::package::load_project, obfuscate, ObfuscationConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ObfuscationConfig::example().with_seed(42);
//!
//!     let mut package = load_project("game.sb3")?;
//!     let report = obfuscate(package.manifest_mut(), &config)?;
//!     package.save("game-obfuscated.sb3")?;
//!
//!     println!("Obfuscation completed in {:.2} seconds.", report.elapsed_seconds());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core data structures
pub mod core {
    //! Manifest views, symbol bookkeeping, configuration and errors.

    pub mod config;
    pub mod errors;
    pub mod manifest;
    pub mod symbols;
}

// Renaming engine
pub mod rename {
    //! Name generation, site discovery and the rewrite pass.

    pub mod generator;
    pub mod pass;
    pub mod proccode;
    pub mod walker;
}

// Non-renaming rewrites
pub mod transforms {
    //! Literal transforms applied after renaming.

    pub mod integers;
}

// Package I/O
pub mod io {
    //! Loading and saving `.sb3` archives.

    pub mod package;
}

// Public API and engine interface
pub mod api {
    //! High-level API and engine interface.

    pub mod engine;
    pub mod results;
}

// Re-export primary types for convenience
pub use api::engine::{obfuscate, ScramblerEngine};
pub use api::results::{Anomaly, CategoryReport, ObfuscationReport};
pub use core::config::{CategoryOptions, NameStrategy, ObfuscationConfig};
pub use core::errors::{Result, ResultExt, ScramblerError};
pub use core::manifest::ManifestGraph;
pub use core::symbols::{Scope, SymbolCategory};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
