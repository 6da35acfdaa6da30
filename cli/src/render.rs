//! Plain-text rendering of the screens the CLI can land on.

use std::fmt::Write as _;

use aischool_core::{HealthStatus, ProfileList, User};

pub fn render_profiles(list: &ProfileList) -> String {
    let mut out = String::from("Profiles\n");
    if list.is_empty() {
        out.push_str("No profiles found.\n");
        return out;
    }
    for (index, profile) in list.iter().enumerate() {
        let grade = if profile.grade.is_empty() { "-" } else { profile.grade.as_str() };
        let _ = writeln!(
            out,
            "{:>2}. {:<12} age {:>2}  grade {grade}",
            index + 1,
            profile.first_name(),
            profile.age,
        );
    }
    out
}

pub fn render_user(user: &User) -> String {
    format!("Registered {} <{}> (id {})\n", user.full_name, user.email, user.id)
}

pub fn render_health(health: &HealthStatus) -> String {
    if health.message.is_empty() {
        format!("{}\n", health.status)
    } else {
        format!("{}: {}\n", health.status, health.message)
    }
}
