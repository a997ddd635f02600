use anyhow::Result;
use serde_json::json;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use vitalsync::core::import::ChannelNotifier;
use vitalsync::models::config::Config;
use vitalsync::output;

pub fn run(seconds: Option<u64>, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let mut service = super::open_service(&config)?;

    let (tx, rx) = mpsc::channel();
    service
        .engine_mut()
        .set_notifier(Box::new(ChannelNotifier::new(tx)));

    // Notices are printed as they arrive, one JSON object per line.
    let printer = thread::spawn(move || {
        let mut count = 0usize;
        for notice in rx {
            count += 1;
            if human_flag {
                println!(
                    "New {} sample at {}",
                    notice.kind,
                    notice.date.format("%Y-%m-%d %H:%M")
                );
            } else if let Ok(line) = serde_json::to_string(&output::success("notice", json!(notice))) {
                println!("{}", line);
            }
        }
        count
    });

    let report = service.start_observing();
    if human_flag {
        let names: Vec<String> = report.watched.iter().map(|k| k.to_string()).collect();
        println!("Watching: {}", names.join(", "));
    }

    let passes = service.watch_for(seconds.map(Duration::from_secs));
    service.stop_observing();
    drop(service);
    let notices = printer.join().unwrap_or(0);

    if human_flag {
        println!("Stopped after {} sync pass(es), {} new sample(s).", passes, notices);
    } else {
        let out = output::success(
            "watch",
            json!({ "report": report, "passes": passes, "notices": notices }),
        );
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
