// lib.rs
pub mod alignment_record;
pub mod clipping;
pub mod commands;
pub mod gene_model;
pub mod interrupt;
pub mod range_match;
pub mod region;
pub mod region_tagger;
pub mod seqidx;
pub mod stats;
pub mod tag_distribution;
