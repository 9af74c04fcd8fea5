//! Uwatch2 CLI
//!
//! Command-line interface for a Uwatch2 watch over the system BLE stack.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use uwatch2::protocol::{format_key, parse_key, parse_values, to_hex_str, CommandKey, Layout};
use uwatch2::transport::{BtleplugConfig, BtleplugTransport};
use uwatch2::watch::{Gender, Period, TimeFormat, TimeOfDay, UnitSystem, UserInfo};
use uwatch2::{ClientConfig, Result, Watch};

/// Uwatch2 CLI
#[derive(Parser, Debug)]
#[command(name = "uwatch2-cli")]
#[command(about = "Control a Uwatch2 smart watch over BLE")]
#[command(version)]
struct Args {
    /// Log every packet and chunk
    #[arg(short, long)]
    debug: bool,

    /// Watch address (falls back to UWATCH2_MAC, then a scan by name)
    #[arg(short, long, conflicts_with = "name")]
    mac: Option<String>,

    /// Name substring to scan for
    #[arg(short, long, default_value = "Uwatch2")]
    name: String,

    /// Seconds to wait for a response, 0 waits forever
    #[arg(short, long, default_value = "10")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OnOff {
    On,
    Off,
}

impl OnOff {
    fn enabled(self) -> bool {
        self == OnOff::On
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the known command keys (no connection needed)
    List,

    /// Vibrate and show a message
    Message { text: String },

    /// Make the watch vibrate
    Find,

    /// Turn the watch off
    Shutdown,

    /// Set the clock to the system time
    SyncTime {
        /// Timezone offset from UTC in whole hours
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        utc_offset_hours: i32,
    },

    /// Show the user profile
    GetUserInfo,

    /// Set the user profile
    SetUserInfo {
        height_cm: u8,
        weight_kg: u8,
        age_years: u8,
        #[arg(long)]
        female: bool,
    },

    GetStepsGoal,
    SetStepsGoal { steps: u32 },
    SetStepLength { cm: u8 },

    GetQuickView,
    SetQuickView { state: OnOff },
    GetQuickViewPeriod,
    SetQuickViewPeriod { from: TimeOfDay, to: TimeOfDay },

    GetTimeFormat,
    /// Use the 24 hour clock (`on`) or the 12 hour clock (`off`)
    SetTimeFormat { twenty_four_hour: OnOff },

    GetMetricSystem,
    /// Use imperial units (`on`) or metric units (`off`)
    SetMetricSystem { imperial: OnOff },

    GetWatchFace,
    SetWatchFace { index: u8 },

    GetBreathingLight,
    SetBreathingLight { state: OnOff },

    GetOtherMessage,
    SetOtherMessage { state: OnOff },

    GetDndPeriod,
    SetDndPeriod { from: TimeOfDay, to: TimeOfDay },

    GetSedentaryReminder,
    SetSedentaryReminder { state: OnOff },
    GetSedentaryReminderPeriod,
    SetSedentaryReminderPeriod { from: TimeOfDay, to: TimeOfDay },

    GetTimingMeasureHeartRate,
    SetTimingMeasureHeartRate { value: u8 },
    GetHeartRate,

    GetAlarms,

    /// Send any known command with a layout-described argument block
    Raw {
        /// Command key, e.g. 0x16
        key: String,

        /// Argument layout, e.g. ">I" or "4B"
        #[arg(long, default_value = "")]
        args: String,

        /// Argument values
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,

        /// Wait for a response and decode it with this layout
        #[arg(long)]
        response: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.debug {
        "info,uwatch2=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(false).init();

    if matches!(args.command, Commands::List) {
        for key in CommandKey::ALL {
            println!("{}  {}", key, key.name());
        }
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut builder = ClientConfig::builder()
        .scan_for_name(args.name.as_str())
        .response_timeout(match args.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        });
    if let Some(mac) = &args.mac {
        builder = builder.address(mac.as_str());
    }

    let transport = BtleplugTransport::new(BtleplugConfig::default())?;
    let watch = Watch::connect(transport, builder.build())?;

    let result = execute(&watch, args.command);
    let closed = watch.close();
    result.and(closed)
}

fn execute(watch: &Watch<BtleplugTransport>, command: Commands) -> Result<()> {
    match command {
        Commands::List => {}
        Commands::Message { text } => watch.send_message(&text)?,
        Commands::Find => watch.find_device()?,
        Commands::Shutdown => watch.shutdown()?,
        Commands::SyncTime { utc_offset_hours } => {
            watch.sync_time_now(utc_offset_hours.saturating_mul(3600))?
        }

        Commands::GetUserInfo => {
            let info = watch.get_user_info()?;
            println!("Height: {} cm", info.height_cm);
            println!("Weight: {} kg", info.weight_kg);
            println!("Age:    {}", info.age_years);
            println!("Gender: {:?}", info.gender);
        }
        Commands::SetUserInfo {
            height_cm,
            weight_kg,
            age_years,
            female,
        } => watch.set_user_info(UserInfo {
            height_cm,
            weight_kg,
            age_years,
            gender: if female { Gender::Female } else { Gender::Male },
        })?,

        Commands::GetStepsGoal => println!("Steps goal: {}", watch.get_steps_goal()?),
        Commands::SetStepsGoal { steps } => watch.set_steps_goal(steps)?,
        Commands::SetStepLength { cm } => watch.set_step_length(cm)?,

        Commands::GetQuickView => println!("Quick view: {}", on_off(watch.get_quick_view()?)),
        Commands::SetQuickView { state } => watch.set_quick_view(state.enabled())?,
        Commands::GetQuickViewPeriod => {
            println!("Quick view period: {}", watch.get_quick_view_period()?)
        }
        Commands::SetQuickViewPeriod { from, to } => {
            watch.set_quick_view_period(Period::new(from, to))?
        }

        Commands::GetTimeFormat => match watch.get_time_format()? {
            TimeFormat::TwelveHour => println!("Time format: 12h"),
            TimeFormat::TwentyFourHour => println!("Time format: 24h"),
        },
        Commands::SetTimeFormat { twenty_four_hour } => {
            watch.set_time_format(if twenty_four_hour.enabled() {
                TimeFormat::TwentyFourHour
            } else {
                TimeFormat::TwelveHour
            })?
        }

        Commands::GetMetricSystem => println!("Units: {:?}", watch.get_metric_system()?),
        Commands::SetMetricSystem { imperial } => watch.set_metric_system(if imperial.enabled() {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        })?,

        Commands::GetWatchFace => println!("Watch face: {}", watch.get_watch_face()?),
        Commands::SetWatchFace { index } => watch.set_watch_face(index)?,

        Commands::GetBreathingLight => {
            println!("Breathing light: {}", on_off(watch.get_breathing_light()?))
        }
        Commands::SetBreathingLight { state } => watch.set_breathing_light(state.enabled())?,

        Commands::GetOtherMessage => {
            println!("Other message: {}", on_off(watch.get_other_message()?))
        }
        Commands::SetOtherMessage { state } => watch.set_other_message(state.enabled())?,

        Commands::GetDndPeriod => println!("Do not disturb: {}", watch.get_dnd_period()?),
        Commands::SetDndPeriod { from, to } => watch.set_dnd_period(Period::new(from, to))?,

        Commands::GetSedentaryReminder => println!(
            "Sedentary reminder: {}",
            on_off(watch.get_sedentary_reminder()?)
        ),
        Commands::SetSedentaryReminder { state } => {
            watch.set_sedentary_reminder(state.enabled())?
        }
        Commands::GetSedentaryReminderPeriod => println!(
            "Sedentary reminder period: {}",
            watch.get_sedentary_reminder_period()?
        ),
        Commands::SetSedentaryReminderPeriod { from, to } => {
            watch.set_sedentary_reminder_period(Period::new(from, to))?
        }

        Commands::GetTimingMeasureHeartRate => println!(
            "Timing measure heart rate: {}",
            watch.get_timing_measure_heart_rate()?
        ),
        Commands::SetTimingMeasureHeartRate { value } => {
            watch.set_timing_measure_heart_rate(value)?
        }
        Commands::GetHeartRate => {
            let rate = watch.get_heart_rate()?;
            println!("High: {}", rate.high);
            println!("Low:  {}", rate.low);
            println!("Readings: {:?}", rate.readings);
        }

        Commands::GetAlarms => {
            for alarm in watch.get_alarms()? {
                println!("{alarm}");
            }
        }

        Commands::Raw {
            key,
            args,
            values,
            response,
        } => {
            let key = CommandKey::try_from(parse_key(&key)?)?;
            let layout: Layout = args.parse()?;
            let values = parse_values(&values)?;
            let client = watch.client();
            match response {
                Some(response) => {
                    let response_layout: Layout = response.parse()?;
                    let decoded = client.query(key, &layout, &values, &response_layout)?;
                    println!("{} ({}) -> {:?}", format_key(key.byte()), key.name(), decoded);
                }
                None => {
                    let packed = layout.pack(&values)?;
                    tracing::info!("{} ({}) args: {}", key, key.name(), to_hex_str(&packed));
                    client.send_raw(key, &packed)?;
                }
            }
        }
    }
    Ok(())
}
