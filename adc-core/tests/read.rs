use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use adc_core::history::ConversionEvent;
use adc_core::{
    AdcConfig, AdcError, Client, ClientRole, Completion, ConversionClient, Device, HostPlatform,
    Revision,
};

#[tokio::test]
async fn read_returns_the_converted_sample() {
    let device = probe(AdcConfig::new(Revision::V2));
    let client = register(&device);

    let irq = fire_when_running(Arc::clone(&device), 0x5A5);
    let value = device.read(&client, 3).await;
    irq.join().expect("interrupt thread");

    assert_eq!(value, Ok(0x5A5));
    assert_eq!(device.error_count(&client), 0);
    assert!(!device.is_claimed(&client));
    assert!(device.status().is_idle());
}

#[tokio::test]
async fn timed_out_read_is_stopped_and_the_client_can_start_again() {
    let device = probe(short_timeout(10));
    let client = register(&device);

    assert_eq!(device.read(&client, 0).await, Err(AdcError::Timeout));

    assert_eq!(device.error_count(&client), 1);
    assert!(!device.is_claimed(&client));
    assert!(!device.is_running(&client));
    let latest = device.with_history(|history| history.latest().map(|record| record.event));
    assert_eq!(
        latest,
        Some(ConversionEvent::ReadTimeout {
            client: client.id(),
            consecutive: 1,
        })
    );

    device
        .start(&client, 0, 1, Completion::Callback)
        .expect("a timed-out client must be able to start again");
}

#[tokio::test]
async fn successful_read_clears_the_timeout_streak() {
    let device = probe(short_timeout(10));
    let client = register(&device);

    assert_eq!(device.read(&client, 0).await, Err(AdcError::Timeout));
    assert_eq!(device.read(&client, 0).await, Err(AdcError::Timeout));
    assert_eq!(device.error_count(&client), 2);

    let irq = fire_when_running(Arc::clone(&device), 0x77);
    assert_eq!(device.read(&client, 0).await, Ok(0x77));
    irq.join().expect("interrupt thread");
    assert_eq!(device.error_count(&client), 0);
}

#[tokio::test]
async fn read_is_refused_while_a_request_is_in_flight() {
    let device = probe(AdcConfig::new(Revision::V2));
    let client = register(&device);

    device
        .start(&client, 0, 4, Completion::Callback)
        .expect("admitted");

    assert_eq!(device.read(&client, 0).await, Err(AdcError::Busy));
    assert!(device.is_running(&client), "the in-flight burst is untouched");
}

#[tokio::test]
async fn read_rejects_out_of_range_channels() {
    let device = probe(AdcConfig::new(Revision::V2));
    let client = register(&device);

    assert_eq!(device.read(&client, 12).await, Err(AdcError::InvalidArgument));
    assert!(!device.is_claimed(&client));
    assert_eq!(device.error_count(&client), 0);
}

#[tokio::test]
async fn read_waits_behind_the_active_client() {
    let device = probe(AdcConfig::new(Revision::V2));
    let busy = register(&device);
    let reader = register(&device);

    device
        .start(&busy, 0, 2, Completion::Callback)
        .expect("admitted");

    let irq = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for value in [1, 2, 0x3C3] {
                wait_for_running(&device);
                device.with_registers(|regs| regs.load_sample(value, 0));
                device.on_interrupt();
            }
        })
    };
    let value = device.read(&reader, 1).await;
    irq.join().expect("interrupt thread");

    assert_eq!(value, Ok(0x3C3));
    assert_eq!(
        device.with_handler(&busy, |sink| sink.samples),
        Some(2),
        "the active burst finishes before the read is served"
    );
}

#[tokio::test]
#[should_panic(expected = "wedged")]
async fn repeated_timeouts_past_the_ceiling_panic() {
    let device = probe(short_timeout(5).with_max_consecutive_errors(1));
    let client = register(&device);

    assert_eq!(device.read(&client, 0).await, Err(AdcError::Timeout));
    let _ = device.read(&client, 0).await;
}

#[derive(Debug, Default)]
struct Sink {
    samples: u32,
}

impl ConversionClient for Sink {
    fn on_sample(&mut self, _data0: u16, _data1: u16, _remaining: &mut u32) {
        self.samples += 1;
    }
}

type TestDevice = Device<HostPlatform, Sink>;

fn short_timeout(millis: u64) -> AdcConfig {
    AdcConfig::new(Revision::V2).with_read_timeout(Duration::from_millis(millis))
}

fn probe(config: AdcConfig) -> Arc<TestDevice> {
    Arc::new(Device::probe(HostPlatform::new(), config).expect("probe should succeed"))
}

fn register(device: &TestDevice) -> Client {
    device
        .register("hwmon", Sink::default(), ClientRole::Ordinary)
        .expect("slot available")
}

fn wait_for_running(device: &TestDevice) {
    for _ in 0..2_000 {
        if !device.status().running.is_empty() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("no conversion was dispatched");
}

fn fire_when_running(device: Arc<TestDevice>, data0: u32) -> JoinHandle<()> {
    thread::spawn(move || {
        wait_for_running(&device);
        device.with_registers(|regs| regs.load_sample(data0, 0));
        device.on_interrupt();
    })
}
