//! Human-readable rendering of upcoming events

use crate::models::{EventTime, RemoteEvent};

const HEADER: &str = "📅 Próximos Eventos 📅\n";
const UNTITLED: &str = "Sem título";

/// Render events as the message shown to the user
pub fn format_events(events: &[RemoteEvent]) -> String {
    let mut out = String::from(HEADER);
    for event in events {
        out.push('\n');
        out.push_str(&format_event(event));
    }
    out
}

fn format_event(event: &RemoteEvent) -> String {
    let (start_date, start_time) = split_boundary(&event.start);
    let (end_date, end_time) = split_boundary(&event.end);

    let mut block = format!(
        "📌 Título: {}\n",
        event.summary.as_deref().unwrap_or(UNTITLED)
    );

    if let Some(date) = start_date {
        block.push_str(&format!("📅 Data: {}\n", day_month_year(date)));
    }
    if let Some(time) = start_time {
        block.push_str(&format!("🕒 Hora de Início: {}\n", hour_minute(time)));
    }
    if let Some(date) = end_date.filter(|d| Some(*d) != start_date) {
        block.push_str(&format!("📅 Data de Término: {}\n", day_month_year(date)));
    }
    if let Some(time) = end_time {
        block.push_str(&format!("🕒 Hora de Término: {}\n", hour_minute(time)));
    }
    if let Some(location) = event.location.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("📍 Localização: {}\n", location));
    }
    if let Some(description) = event.description.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("📝 Descrição: {}\n", description));
    }

    let participants: Vec<&str> = event
        .attendees
        .iter()
        .filter_map(|a| a.email.as_deref().or(a.display_name.as_deref()))
        .collect();
    // the participants line closes its block with a blank line
    if !participants.is_empty() {
        block.push_str(&format!("👥 Participantes: {}\n\n", participants.join(", ")));
    }

    block
}

/// Date and optional time-of-day of an event boundary
fn split_boundary(time: &EventTime) -> (Option<&str>, Option<&str>) {
    match (&time.date_time, &time.date) {
        (Some(date_time), _) => match date_time.split_once('T') {
            Some((date, time)) => (Some(date), Some(time)),
            None => (Some(date_time.as_str()), None),
        },
        (None, Some(date)) => (Some(date.as_str()), None),
        (None, None) => (None, None),
    }
}

/// `2024-03-15` -> `15/03/2024`
fn day_month_year(date: &str) -> String {
    date.split('-').rev().collect::<Vec<_>>().join("/")
}

/// `09:00:00-03:00` -> `09:00`
fn hour_minute(time: &str) -> String {
    let without_offset = time
        .split('+')
        .next()
        .unwrap_or(time)
        .split('-')
        .next()
        .unwrap_or(time)
        .trim_end_matches('Z');
    without_offset.chars().take(5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteAttendee;

    #[test]
    fn test_empty_list_renders_header_only() {
        assert_eq!(format_events(&[]), "📅 Próximos Eventos 📅\n");
    }

    #[test]
    fn test_event_without_end() {
        let event = RemoteEvent {
            summary: Some("Dentista".to_string()),
            start: EventTime::at("2024-03-15T09:00:00-03:00"),
            ..Default::default()
        };

        let text = format_events(&[event]);
        assert_eq!(
            text,
            "📅 Próximos Eventos 📅\n\n📌 Título: Dentista\n📅 Data: 15/03/2024\n🕒 Hora de Início: 09:00\n"
        );
        assert!(!text.contains("Término"));
    }

    #[test]
    fn test_same_day_end_shows_only_time() {
        let event = RemoteEvent {
            summary: Some("Reunião".to_string()),
            start: EventTime::at("2024-03-15T09:00:00-03:00"),
            end: EventTime::at("2024-03-15T10:30:00-03:00"),
            location: Some("Sala 2".to_string()),
            attendees: vec![
                RemoteAttendee {
                    email: Some("ana@example.com".to_string()),
                    ..Default::default()
                },
                RemoteAttendee {
                    email: Some("bia@example.com".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let text = format_events(&[event]);
        assert!(!text.contains("Data de Término"));
        assert!(text.contains("🕒 Hora de Término: 10:30\n"));
        assert!(text.contains("📍 Localização: Sala 2\n"));
        assert!(text.ends_with("👥 Participantes: ana@example.com, bia@example.com\n\n"));
    }

    #[test]
    fn test_participants_line_separates_next_event() {
        let with_guests = RemoteEvent {
            summary: Some("Almoço".to_string()),
            attendees: vec![RemoteAttendee {
                display_name: Some("Carla".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let next = RemoteEvent {
            summary: Some("Academia".to_string()),
            ..Default::default()
        };

        let text = format_events(&[with_guests, next]);
        assert_eq!(
            text,
            "📅 Próximos Eventos 📅\n\n📌 Título: Almoço\n👥 Participantes: Carla\n\n\n📌 Título: Academia\n"
        );
    }

    #[test]
    fn test_multi_day_event_shows_end_date() {
        let event = RemoteEvent {
            start: EventTime::at("2024-03-15T22:00:00+01:00"),
            end: EventTime::at("2024-03-16T02:00:00+01:00"),
            ..Default::default()
        };

        let text = format_events(&[event]);
        assert!(text.contains("📌 Título: Sem título\n"));
        assert!(text.contains("📅 Data de Término: 16/03/2024\n"));
        assert!(text.contains("🕒 Hora de Término: 02:00\n"));
    }

    #[test]
    fn test_all_day_event_has_no_time() {
        let event = RemoteEvent {
            summary: Some("Feriado".to_string()),
            start: EventTime::on("2024-04-21"),
            end: EventTime::on("2024-04-22"),
            ..Default::default()
        };

        let text = format_events(&[event]);
        assert!(text.contains("📅 Data: 21/04/2024\n"));
        assert!(!text.contains("Hora"));
    }

    #[test]
    fn test_hour_minute_strips_offsets() {
        assert_eq!(hour_minute("09:00:00-03:00"), "09:00");
        assert_eq!(hour_minute("18:45:00+05:30"), "18:45");
        assert_eq!(hour_minute("07:15:00Z"), "07:15");
    }
}
