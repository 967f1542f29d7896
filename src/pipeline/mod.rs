pub mod quote; // Supplier quote sheet analysis
