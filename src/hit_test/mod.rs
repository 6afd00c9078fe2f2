//! Geometric hit testing against page marks

pub mod hit_tester;

pub use hit_tester::{ClickAction, HitResult, HitTester, HitThresholds, NotEligible};
