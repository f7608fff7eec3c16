//! Behavioral tests for the lifecycle manager, built on scripted capability
//! stubs from [`test_helpers`](super::test_helpers).

mod submit;
