// src/builders/mod.rs

pub mod locker_builder;

pub use locker_builder::LockerBuilder;
