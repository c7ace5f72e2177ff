//! Rendering of plan records for the command line.
//!
//! Two formats are offered: an aligned text table (the default) and pretty
//! JSON. Renderers write to any `io::Write` so they can be tested against a
//! buffer.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::models::{Event, Plan, PlanDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Tabular,
    Json,
}

/// Go-style RFC 822 timestamp, e.g. `02 Jan 16 15:04 UTC`.
pub fn rfc822(time: &DateTime<Utc>) -> String {
    time.format("%d %b %y %H:%M %Z").to_string()
}

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339()
}

/// Column-aligned text table. The first column is left aligned, the rest
/// right aligned; multi-line cells continue on following lines.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    fn write_to(&self, w: &mut dyn Write) -> io::Result<()> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let widest = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                widths[i] = widths[i].max(widest);
            }
        }

        for row in &self.rows {
            let cells: Vec<Vec<&str>> = row.iter().map(|cell| cell.lines().collect()).collect();
            let height = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            for line in 0..height {
                let mut text = String::new();
                for (i, cell) in cells.iter().enumerate() {
                    let part = cell.get(line).copied().unwrap_or("");
                    if i > 0 {
                        text.push(' ');
                        text.push_str(&format!("{part:>width$}", width = widths[i]));
                    } else {
                        text.push_str(&format!("{part:<width$}", width = widths[i]));
                    }
                }
                writeln!(w, "{}", text.trim_end())?;
            }
        }
        Ok(())
    }
}

fn write_json<T: Serialize>(w: &mut dyn Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)
}

/// Plan list as returned by list-plans and show-plan-revisions.
pub fn write_plans(w: &mut dyn Write, format: OutputFormat, plans: &[Plan]) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(w, &plans),
        OutputFormat::Tabular => {
            let mut table = Table::default();
            table.add_row(["PLAN", "CREATED ON", "EFFECTIVE TIME", "DEFINITION"]);
            for plan in plans {
                let effective = plan.effective_time.as_ref().map(rfc3339).unwrap_or_default();
                table.add_row([
                    plan.id.clone(),
                    plan.created_on.clone(),
                    effective,
                    plan.definition.clone(),
                ]);
            }
            table.write_to(w)
        }
    }
}

#[derive(Debug, Serialize)]
struct EventView<'a> {
    user: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    time: DateTime<Utc>,
}

impl<'a> From<&'a Event> for EventView<'a> {
    fn from(event: &'a Event) -> Self {
        EventView {
            user: &event.user,
            kind: &event.kind,
            time: event.time,
        }
    }
}

#[derive(Debug, Serialize)]
struct CharmView<'a> {
    charm: &'a str,
    attached: EventView<'a>,
    #[serde(rename = "effective-since", skip_serializing_if = "Option::is_none")]
    effective_since: Option<DateTime<Utc>>,
    default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<EventView<'a>>,
}

/// What show-plan prints. The definition, description and price are only
/// included on request.
#[derive(Debug, Serialize)]
struct DetailsView<'a> {
    id: &'a str,
    created: EventView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    released: Option<EventView<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    definition: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    price: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    charms: Vec<CharmView<'a>>,
}

impl<'a> DetailsView<'a> {
    fn new(details: &'a PlanDetails, show_content: bool) -> Self {
        let (definition, description, price) = if show_content {
            (
                details.plan.definition.as_str(),
                details.plan.description.as_str(),
                details.plan.price.as_str(),
            )
        } else {
            ("", "", "")
        };
        DetailsView {
            id: &details.plan.id,
            created: (&details.created).into(),
            released: details.released.as_ref().map(EventView::from),
            definition,
            description,
            price,
            charms: details
                .charms
                .iter()
                .map(|charm| CharmView {
                    charm: &charm.charm_url,
                    attached: (&charm.attached).into(),
                    effective_since: charm.effective_since,
                    default: charm.default,
                    events: charm.events.iter().map(EventView::from).collect(),
                })
                .collect(),
        }
    }

    fn write_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let mut table = Table::default();
        table.add_row(["PLAN"]);
        table.add_row([self.id]);
        table.add_row(["", "CREATED BY", "TIME"]);
        table.add_row([
            String::new(),
            self.created.user.to_string(),
            rfc3339(&self.created.time),
        ]);
        if let Some(released) = &self.released {
            table.add_row(["", "RELEASED BY", "TIME"]);
            table.add_row([String::new(), released.user.to_string(), rfc3339(&released.time)]);
        }
        if !self.description.is_empty() {
            table.add_row(["", "DESCRIPTION", self.description]);
        }
        if !self.price.is_empty() {
            table.add_row(["", "PRICE", self.price]);
        }
        if !self.definition.is_empty() {
            table.add_row(["", "DEFINITION", self.definition]);
        }
        if !self.charms.is_empty() {
            table.add_row(["CHARMS"]);
            for charm in &self.charms {
                table.add_row(["CHARM", "ATTACHED BY", "TIME", "DEFAULT", "EFFECTIVE SINCE"]);
                table.add_row([
                    charm.charm.to_string(),
                    charm.attached.user.to_string(),
                    rfc3339(&charm.attached.time),
                    charm.default.to_string(),
                    charm.effective_since.as_ref().map(rfc3339).unwrap_or_default(),
                ]);
                if !charm.events.is_empty() {
                    table.add_row(["", "EVENTS"]);
                    table.add_row(["", "", "BY", "TYPE", "TIME"]);
                    for event in &charm.events {
                        table.add_row([
                            String::new(),
                            String::new(),
                            event.user.to_string(),
                            event.kind.to_string(),
                            rfc3339(&event.time),
                        ]);
                    }
                }
            }
        }
        table.write_to(w)
    }
}

pub fn write_plan_details(
    w: &mut dyn Write,
    format: OutputFormat,
    details: &PlanDetails,
    show_content: bool,
) -> io::Result<()> {
    let view = DetailsView::new(details, show_content);
    match format {
        OutputFormat::Json => write_json(w, &view),
        OutputFormat::Tabular => view.write_table(w),
    }
}

/// Plan id followed by the raw definition, nothing else.
pub fn write_definition(w: &mut dyn Write, details: &PlanDetails) -> io::Result<()> {
    writeln!(w, "{}", details.plan.id)?;
    write!(w, "{}", details.plan.definition)
}

pub fn write_released(w: &mut dyn Write, plan: &Plan) -> io::Result<()> {
    writeln!(w, "{}", plan.id)?;
    if let Some(effective) = &plan.effective_time {
        writeln!(w, "effective from {}", rfc822(effective))?;
    }
    Ok(())
}
