use clap::ValueEnum;

use crate::models::employee::Employee;

/// Which column the list search matches against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SearchBy {
    #[default]
    Id,
    Name,
    Phone,
}

/// Local, in-memory search over an already fetched list. Id and name match
/// case-insensitively; phone matches the digits as typed.
pub fn filter_employees<'a>(employees: &'a [Employee], search: &str, by: SearchBy) -> Vec<&'a Employee> {
    let needle = search.to_lowercase();
    employees
        .iter()
        .filter(|employee| match by {
            SearchBy::Id => employee.employee_id.to_lowercase().contains(&needle),
            SearchBy::Name => employee.name.to_lowercase().contains(&needle),
            SearchBy::Phone => employee.phone.contains(search),
        })
        .collect()
}
