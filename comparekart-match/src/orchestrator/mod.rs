//! Comparison orchestrator: concurrent fan-out, clustering, aggregation.
//!
//! This module fans a query out to every selected source concurrently,
//! merges the tagged listings in dispatch order, groups listings that look
//! like the same product, and summarises every group spanning two or more
//! sources.

pub mod aggregate;
pub mod cluster;
pub mod compare;
pub mod fanout;
