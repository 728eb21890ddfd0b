pub mod lifecycle_tests;
