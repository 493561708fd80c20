//! Demonstrates the three adapters on a single emitter.
//!
//! A simulated download reports progress through events. One consumer waits for it to start,
//! another collects the first few progress reports and a third streams all of them.

use std::rc::Rc;

use event_bridge::{LocalEmitter, Options, Payload, Step, collect, stream, wait_for};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;

fn main() {
    let download = Rc::new(LocalEmitter::<u32>::new());
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let started = wait_for(&download, "started", Options::new()).unwrap();
    spawner
        .spawn_local(async move {
            let size = started.await.unwrap();
            println!("Download started, {} bytes", size.into_first().unwrap_or_default());
        })
        .unwrap();

    let first_reports = collect(&download, "progress", Options::new().count(3_usize)).unwrap();
    spawner
        .spawn_local(async move {
            let reports = first_reports.await.unwrap();
            println!("First {} progress reports: {:?}", reports.len(), reports.to_vec());
        })
        .unwrap();

    let mut progress = stream(
        &download,
        "progress",
        Options::new()
            .resolution_events("finished")
            .filter(|payload: &Payload<u32>| payload.first().is_some_and(|percent| percent % 25 == 0)),
    )
    .unwrap();
    spawner
        .spawn_local(async move {
            while let Ok(Step::Item(payload)) = progress.recv().await {
                println!("Milestone: {}%", payload.into_first().unwrap_or_default());
            }

            println!("Progress stream ended");
        })
        .unwrap();

    pool.run_until_stalled();

    download.emit("started", &[4096]);
    for percent in (0..=100).step_by(5) {
        download.emit("progress", &[percent]);
        pool.run_until_stalled();
    }
    download.emit("finished", &[]);

    pool.run();

    println!("Listeners left: {}", download.total_listener_count());
}
