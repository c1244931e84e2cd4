// Output formatting — terminal display of aggregated cluster rows.

pub mod terminal;
