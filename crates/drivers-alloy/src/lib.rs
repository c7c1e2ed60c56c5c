#![doc = include_str!("../README.md")]
#![warn(missing_debug_implementations, missing_docs, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod aliases;
pub use aliases::{NodeKind, RpcAliases};

mod driver;
pub use driver::AlloyNodeDriver;

mod tx;
