//! ASPIC+ structured argumentation: argument construction over a rule
//! base with unification and arithmetic side-conditions, attack and
//! defeat derivation under weakest-link or last-link orderings, and a
//! typed boundary toward an external Dung-framework extension solver.

pub mod aspic;
