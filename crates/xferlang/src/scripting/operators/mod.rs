mod comparison;
mod logical;
mod utility;
