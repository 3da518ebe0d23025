use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;

use activities_core::allocations::{AllocationEvent, AllocationStatus};
use activities_core::calendar::{HolidayCalendar, StaticHolidayCalendar};
use activities_core::config::AppConfig;
use activities_core::domain::{DayOfWeekSet, ScheduleId, TenantCode, TimeSlot};
use activities_core::schedules::materializer::materialize;
use activities_core::schedules::{ActivitySchedule, ScheduleSlot};
use activities_core::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Activities Core",
    about = "Inspect the scheduling and allocation engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Materialize a sample schedule over the configured horizon and print
    /// the resulting session instances
    Materialize(MaterializeArgs),
    /// Print the allocation status transition table
    Transitions,
}

#[derive(Args, Debug, Default)]
struct MaterializeArgs {
    /// Date to start the window from (defaults to today)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Override the configured horizon in days
    #[arg(long)]
    horizon: Option<u16>,
    /// Treat this date as a holiday when expanding the window
    #[arg(long)]
    holiday: Vec<NaiveDate>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    telemetry::init(&config)?;

    let cli = Cli::parse();
    match cli.command {
        Command::Materialize(args) => run_materialize_demo(&config, args),
        Command::Transitions => print_transition_table(),
    }

    Ok(())
}

fn run_materialize_demo(config: &AppConfig, args: MaterializeArgs) {
    let today = args.from.unwrap_or_else(|| Local::now().date_naive());
    let horizon = args.horizon.unwrap_or(config.scheduling.horizon_days);
    let calendar = StaticHolidayCalendar::with_holidays("england-and-wales", &args.holiday);

    let mut schedule = sample_schedule(today);
    let created = materialize(&mut schedule, today, horizon, |date| {
        calendar.is_holiday(date, "england-and-wales")
    });

    info!(
        schedule = schedule.id.0,
        created = created.len(),
        horizon,
        "materialized demo schedule"
    );

    let body = json!({
        "schedule": schedule.activity_summary,
        "window": { "from": today, "days": horizon },
        "instances": created,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
    );
}

fn print_transition_table() {
    const STATUSES: [AllocationStatus; 6] = [
        AllocationStatus::Pending,
        AllocationStatus::Active,
        AllocationStatus::Suspended,
        AllocationStatus::SuspendedWithPay,
        AllocationStatus::AutoSuspended,
        AllocationStatus::Ended,
    ];
    const EVENTS: [AllocationEvent; 7] = [
        AllocationEvent::Activate,
        AllocationEvent::Suspend { paid: false },
        AllocationEvent::Suspend { paid: true },
        AllocationEvent::Unsuspend,
        AllocationEvent::AutoSuspend,
        AllocationEvent::Reinstate,
        AllocationEvent::Deallocate,
    ];

    for status in STATUSES {
        println!("{}:", status.label());
        for event in EVENTS {
            match status.transition(event) {
                Ok(next) => println!("  {event:?} -> {}", next.label()),
                Err(err) => println!("  {event:?} -> rejected ({err})"),
            }
        }
    }
}

fn sample_schedule(start: NaiveDate) -> ActivitySchedule {
    use chrono::Weekday;

    ActivitySchedule {
        id: ScheduleId(1),
        tenant: TenantCode::new("DEMO"),
        activity_summary: "Workshop AM".to_string(),
        start_date: start,
        end_date: None,
        schedule_weeks: 2,
        runs_on_holidays: false,
        slots: vec![
            ScheduleSlot {
                week_number: 1,
                time_slot: TimeSlot::Am,
                days: DayOfWeekSet::from_days(&[Weekday::Mon, Weekday::Wed]),
                starts_at: chrono::NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
                ends_at: chrono::NaiveTime::from_hms_opt(11, 30, 0).expect("valid time"),
            },
            ScheduleSlot {
                week_number: 2,
                time_slot: TimeSlot::Pm,
                days: DayOfWeekSet::from_days(&[Weekday::Fri]),
                starts_at: chrono::NaiveTime::from_hms_opt(13, 45, 0).expect("valid time"),
                ends_at: chrono::NaiveTime::from_hms_opt(16, 45, 0).expect("valid time"),
            },
        ],
        instances: Vec::new(),
        suspensions: Vec::new(),
    }
}
