use expert_portal::summary::UNAVAILABLE_MESSAGE;
use expert_portal::{
    Appointment, DashboardState, Expert, Question, Span, SummaryEntry, SummaryContent, Tab,
    emphasis_spans,
};
use std::fmt::Write;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn tab_bar(active: Tab) -> String {
    Tab::ALL
        .iter()
        .enumerate()
        .map(|(idx, tab)| {
            if *tab == active {
                format!("[{} {}]", idx + 1, tab.label())
            } else {
                format!(" {} {} ", idx + 1, tab.label())
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

pub fn dashboard(state: &DashboardState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", tab_bar(state.active_tab));
    if let Some(message) = &state.message {
        let _ = writeln!(out, "> {}", message);
    }

    match state.active_tab {
        Tab::Dashboard => match &state.expert {
            Some(expert) => out.push_str(&profile(expert)),
            None => out.push_str("Loading profile...\n"),
        },
        Tab::PendingAppointments => {
            out.push_str(&appointments(state, &state.pending, "No pending appointments."))
        }
        Tab::ConfirmedAppointments => out.push_str(&appointments(
            state,
            &state.confirmed,
            "No confirmed appointments.",
        )),
        Tab::Summary => out.push_str(&summaries(&state.summaries)),
        Tab::Feedback => {
            let awaiting: Vec<Appointment> = state
                .confirmed
                .iter()
                .filter(|a| a.awaiting_feedback())
                .cloned()
                .collect();
            out.push_str(&appointments(
                state,
                &awaiting,
                "No appointments awaiting feedback.",
            ))
        }
    }
    out
}

fn profile(expert: &Expert) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:           {}", expert.name);
    let _ = writeln!(out, "Email:          {}", expert.email);
    let _ = writeln!(out, "Specialization: {}", expert.specialization);
    let _ = writeln!(
        out,
        "Address:        {}",
        expert.address.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Gender:         {}",
        expert.gender.as_deref().unwrap_or("-")
    );
    out
}

fn appointments(state: &DashboardState, list: &[Appointment], empty: &str) -> String {
    if state.loading_appointments {
        return "Loading appointments...\n".to_string();
    }
    if list.is_empty() {
        return format!("{}\n", empty);
    }

    let mut out = String::new();
    for appointment in list {
        let _ = writeln!(
            out,
            "  {:<26} {:<10} {:<6} {}",
            appointment.id,
            appointment.display_date(),
            appointment.time,
            appointment.status
        );
    }
    out
}

fn summaries(entries: &[SummaryEntry]) -> String {
    if entries.is_empty() {
        return "No summaries yet.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "Appointment {} ({})", entry.appointment_id, entry.created);
        match &entry.content {
            SummaryContent::Unavailable => {
                let _ = writeln!(out, "  {}", UNAVAILABLE_MESSAGE);
            }
            SummaryContent::Parsed(lines) => {
                for line in lines {
                    let _ = writeln!(out, "  {}", emphasised(line));
                }
            }
        }
    }
    out
}

fn emphasised(line: &str) -> String {
    emphasis_spans(line)
        .into_iter()
        .map(|span| match span {
            Span::Plain(text) => text,
            Span::Emphasis(text) => format!("{}{}{}", BOLD, text, RESET),
        })
        .collect()
}

pub fn question(question: &Question) -> String {
    let mut out = format!("{}\n", question.text);
    for (idx, option) in question.options.iter().enumerate() {
        let _ = writeln!(out, "  {}) {}", idx + 1, option);
    }
    out
}
