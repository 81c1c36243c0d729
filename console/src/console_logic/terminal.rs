//! Line-oriented terminal rendering of dashboard widgets.

use std::io::{self, Write};

use lib_dashboard::dashboard::views::{RankingView, MISSING_CELL};
use lib_dashboard::{Renderer, ViewModel, WidgetId};

/// Rows shown for the long tables.
const TABLE_ROWS: usize = 10;

/// Writes every widget draw as a block of text lines.
///
/// Clock ticks only update the header; printing one every second would bury
/// everything else.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    clock: String,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            clock: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn draw(&mut self, widget: WidgetId, view: &ViewModel) {
        if let ViewModel::Clock(clock) = view {
            self.clock = clock.clone();
            return;
        }
        let lines = render_lines(widget, view);
        if lines.is_empty() {
            return;
        }
        let result = (|| -> io::Result<()> {
            writeln!(self.out, "== {:?} [{}] ==", widget, self.clock)?;
            for line in &lines {
                writeln!(self.out, "  {}", line)?;
            }
            self.out.flush()
        })();
        if let Err(e) = result {
            log::error!("Terminal write failed for {:?}: {}", widget, e);
        }
    }
}

fn ranking_lines(view: &RankingView) -> Vec<String> {
    view.entries.iter().map(|e| format!("{:<24} {}", e.label, e.count)).collect()
}

/// Text rendering of one widget.
pub fn render_lines(_widget: WidgetId, view: &ViewModel) -> Vec<String> {
    match view {
        ViewModel::Stats(s) => vec![format!(
            "events {} | critical {} | high {} | sources {} | alerts {} | failed logins {} | intel {}",
            s.total, s.critical, s.high, s.sources, s.alerts, s.logins, s.intel
        )],
        ViewModel::Timeline(t) => t
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                format!(
                    "{} C:{} H:{} M:{} L:{}",
                    label,
                    t.critical.get(i).copied().unwrap_or(0),
                    t.high.get(i).copied().unwrap_or(0),
                    t.medium.get(i).copied().unwrap_or(0),
                    t.low.get(i).copied().unwrap_or(0)
                )
            })
            .collect(),
        ViewModel::Severity(s) => vec![format!(
            "critical {} | high {} | medium {} | low {}",
            s.values[0], s.values[1], s.values[2], s.values[3]
        )],
        ViewModel::EventFeed(feed) => feed
            .lines
            .iter()
            .take(TABLE_ROWS)
            .map(|l| {
                format!(
                    "{} {:<8} {:<15} {}{}",
                    l.time,
                    l.severity,
                    l.source_ip,
                    l.message,
                    if l.flagged { " [intel]" } else { "" }
                )
            })
            .collect(),
        ViewModel::Ranking(r) => ranking_lines(r),
        ViewModel::Sources(rows) => rows
            .iter()
            .take(TABLE_ROWS)
            .map(|r| format!("{:<15} {} {} total {} high {}", r.source_ip, r.country, r.city, r.total, r.high_sev))
            .collect(),
        ViewModel::Alerts(a) => {
            let mut lines = vec![format!("{} unacknowledged", a.badge)];
            lines.extend(a.rows.iter().take(TABLE_ROWS).map(|r| {
                format!(
                    "#{} {} {:<8} {} {} ({} events, {}){}",
                    r.id,
                    r.time,
                    r.severity,
                    r.alert_type,
                    r.source_ip,
                    r.event_count,
                    r.technique,
                    if r.acknowledged { " ack" } else { "" }
                )
            }));
            lines
        }
        ViewModel::Logins(rows) => rows
            .iter()
            .take(TABLE_ROWS)
            .map(|r| format!("{:<15} {:<12} {} attempts {}", r.source_ip, r.username, r.attempts, r.location))
            .collect(),
        ViewModel::Mitre(m) => match m.placeholder {
            Some(text) => vec![text.to_string()],
            None => m
                .cards
                .iter()
                .map(|c| format!("{} {} x{}", c.technique, c.tactic, c.count))
                .collect(),
        },
        ViewModel::Intel(i) => match i.placeholder {
            Some(text) => vec![text.to_string()],
            None => i
                .rows
                .iter()
                .map(|r| format!("{:<15} {} hits {} last {}", r.ip, r.threat_type, r.hit_count, r.last_seen))
                .collect(),
        },
        ViewModel::Geo(g) => g
            .markers
            .iter()
            .take(TABLE_ROWS)
            .map(|m| format!("({:.2}, {:.2}) r={:.0} {:?}", m.lat, m.lng, m.radius, m.tier))
            .collect(),
        ViewModel::Connection(c) => vec![format!("live channel {}", c.label())],
        ViewModel::Clock(c) => vec![if c.is_empty() { MISSING_CELL.to_string() } else { c.clone() }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_dashboard::dashboard::model::{CountMap, Stats};
    use lib_dashboard::dashboard::views::{event_type_ranking, mitre_view, stats_view};
    use lib_dashboard::Connectivity;

    #[test]
    fn test_stats_line_uses_separators() {
        let view = ViewModel::Stats(stats_view(&Stats { total_events: 12345, ..Default::default() }));
        let lines = render_lines(WidgetId::Stats, &view);
        assert!(lines[0].starts_with("events 12,345 |"));
    }

    #[test]
    fn test_ranking_lines_follow_view_order() {
        let counts = CountMap::from_pairs(vec![("port_scan", 3), ("auth_failure", 9)]);
        let lines = render_lines(WidgetId::EventTypes, &ViewModel::Ranking(event_type_ranking(&counts)));
        assert!(lines[0].starts_with("auth failure"));
        assert!(lines[1].starts_with("port scan"));
    }

    #[test]
    fn test_placeholder_is_shown() {
        let lines = render_lines(WidgetId::Mitre, &ViewModel::Mitre(mitre_view(&[])));
        assert_eq!(lines, vec!["Waiting for correlated events...".to_string()]);
    }

    #[test]
    fn test_clock_only_updates_header() {
        let mut r = TerminalRenderer::new(Vec::new());
        r.draw(WidgetId::Clock, &ViewModel::Clock("Jan 2, 03:04:05".into()));
        r.draw(WidgetId::Connection, &ViewModel::Connection(Connectivity::Live));
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(text, "== Connection [Jan 2, 03:04:05] ==\n  live channel LIVE\n");
    }
}
