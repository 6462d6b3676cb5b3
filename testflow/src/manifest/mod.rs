//! Declarative plugins.
//!
//! A manifest is a JSON document naming a plugin, its help text and the
//! steps each lifecycle stage performs. [`Manifest::into_plugin`] turns it
//! into a [`crate::plugin::TablePlugin`].
//!
//! ```json
//! {
//!   "name": "SampleSubTests",
//!   "help": [{ "section": "SampleSubTests", "text": ["Runs a tool three times."] }],
//!   "execute": [
//!     { "name": "executeRunTool", "steps": [
//!       { "action": "run", "label": "Run tool", "mnemonic": "CL", "instances": 3,
//!         "expect": { "mode": "clean-exit", "within": "10s" },
//!         "command": "sh", "args": ["-c", "exit 0"] }
//!     ]}
//!   ]
//! }
//! ```

mod document;
mod steps;

pub use document::{ExecuteStage, HelpEntry, Manifest};
pub use steps::{RunStep, Step, WriteFileStep};
