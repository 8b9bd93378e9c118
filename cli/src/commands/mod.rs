mod analytics;
mod helpers;
mod meal;
mod suggest;

pub(crate) use analytics::{cmd_compare, cmd_estimate, cmd_route};
pub(crate) use meal::{cmd_meal_import, cmd_meal_plan};
pub(crate) use suggest::{cmd_categorize, cmd_suggest, cmd_tips};
