use adc_core::registers::{Register, con};
use adc_core::{
    AdcConfig, AdcError, Bank, Client, ClientRole, Completion, ConversionClient, Device,
    HostPlatform, Revision,
};

#[test]
fn priority_and_fifo_clients_started_while_idle_run_in_start_order() {
    let device = probe(Revision::V2);
    let c1 = register(&device, "ts", ClientRole::Priority);
    let c2 = register(&device, "hwmon0", ClientRole::Ordinary);
    let c3 = register(&device, "hwmon1", ClientRole::Ordinary);

    device.start(&c1, 0, 1, Completion::Callback).expect("c1 admitted");
    device.start(&c2, 1, 1, Completion::Callback).expect("c2 admitted");
    device.start(&c3, 2, 1, Completion::Callback).expect("c3 admitted");

    fire(&device, 3);

    assert_eq!(
        dispatch_order(&device),
        vec![c1.id(), c2.id(), c3.id()],
        "idle device should dispatch the priority request first, then the FIFO"
    );
    assert!(device.status().is_idle());
}

#[test]
fn priority_request_overtakes_a_deep_fifo() {
    let device = probe(Revision::V2);
    let ordinary: Vec<Client> = (0..4)
        .map(|_| register(&device, "hwmon", ClientRole::Ordinary))
        .collect();
    let ts = register(&device, "ts", ClientRole::Priority);

    for client in &ordinary {
        device
            .start(client, 0, 1, Completion::Callback)
            .expect("ordinary admitted");
    }
    device
        .start(&ts, 0, 4, Completion::Callback)
        .expect("priority admitted");

    let status = device.status();
    assert_eq!(status.active, Some(ordinary[0].id()));
    assert_eq!(status.priority, Some(ts.id()));
    assert_eq!(status.pending.len(), 3);

    // Completing the active ordinary conversion hands over to the touchscreen.
    fire(&device, 1);
    assert_eq!(device.status().active, Some(ts.id()));
    assert!(device.is_running(&ts));

    fire(&device, 4 + 3);
    let expected: Vec<_> = [ordinary[0].id(), ts.id()]
        .into_iter()
        .chain(ordinary[1..].iter().map(Client::id))
        .collect();
    assert_eq!(dispatch_order(&device), expected);
}

#[test]
fn ordinary_clients_are_served_in_strict_arrival_order() {
    let device = probe(Revision::V3);
    let clients: Vec<Client> = (0..6)
        .map(|_| register(&device, "hwmon", ClientRole::Ordinary))
        .collect();

    for index in [3_usize, 0, 5, 1, 4, 2] {
        device
            .start(&clients[index], 0, 1, Completion::Callback)
            .expect("admitted");
    }
    fire(&device, 6);

    let expected: Vec<_> = [3_usize, 0, 5, 1, 4, 2]
        .into_iter()
        .map(|index| clients[index].id())
        .collect();
    assert_eq!(dispatch_order(&device), expected);
}

#[test]
fn second_priority_client_is_busy_while_the_slot_is_taken() {
    let device = probe(Revision::V2);
    let blocker = register(&device, "hwmon", ClientRole::Ordinary);
    let ts = register(&device, "ts", ClientRole::Priority);
    let other = register(&device, "ts-aux", ClientRole::Priority);

    device
        .start(&blocker, 0, 1, Completion::Callback)
        .expect("blocker admitted");
    device
        .start(&ts, 0, 1, Completion::Callback)
        .expect("ts takes the priority slot");

    assert_eq!(
        device.start(&other, 0, 1, Completion::Callback),
        Err(AdcError::Busy)
    );
    assert!(
        !device.is_claimed(&other),
        "a refused start must not leave the client claimed"
    );

    // Once the slot has been dispatched it is free again.
    fire(&device, 1);
    device
        .start(&other, 0, 1, Completion::Callback)
        .expect("slot free after dispatch");
}

#[test]
fn double_start_is_refused_without_disturbing_the_request() {
    let device = probe(Revision::V2);
    let client = register(&device, "hwmon", ClientRole::Ordinary);

    device
        .start(&client, 2, 3, Completion::Callback)
        .expect("first start");
    assert_eq!(
        device.start(&client, 2, 3, Completion::Callback),
        Err(AdcError::Busy)
    );

    fire(&device, 3);
    assert_eq!(
        device.with_handler(&client, |recorder| recorder.samples.len()),
        Some(3)
    );
}

#[test]
fn start_rejects_invalid_requests() {
    let device = probe(Revision::V2);
    let client = register(&device, "hwmon", ClientRole::Ordinary);

    assert_eq!(
        device.start(&client, 0, 0, Completion::Callback),
        Err(AdcError::InvalidArgument)
    );
    assert_eq!(
        device.start(&client, 8, 1, Completion::Callback),
        Err(AdcError::InvalidArgument),
        "V2 converters only have channels 0..8"
    );
    assert!(!device.is_claimed(&client));

    let wide = probe(Revision::V4);
    let wide_client = register(&wide, "hwmon", ClientRole::Ordinary);
    wide.start(&wide_client, 9, 1, Completion::Callback)
        .expect("V4 converters expose ten channels");
}

#[test]
fn handles_from_another_device_are_rejected() {
    let device = probe(Revision::V2);
    let _local = register(&device, "hwmon", ClientRole::Ordinary);

    let other = probe(Revision::V2);
    let _first = register(&other, "a", ClientRole::Ordinary);
    let foreign = register(&other, "b", ClientRole::Ordinary);

    assert_eq!(
        device.start(&foreign, 0, 1, Completion::Callback),
        Err(AdcError::InvalidArgument)
    );
}

#[test]
fn registration_is_bounded_by_slot_count() {
    let device: Device<HostPlatform, Recorder, 2> =
        Device::probe(HostPlatform::new(), AdcConfig::new(Revision::V2)).expect("probe");

    assert_eq!(
        device
            .register("", Recorder::default(), ClientRole::Ordinary)
            .err(),
        Some(AdcError::InvalidArgument)
    );

    let first = device
        .register("a", Recorder::default(), ClientRole::Ordinary)
        .expect("slot 0");
    let _second = device
        .register("b", Recorder::default(), ClientRole::Ordinary)
        .expect("slot 1");
    assert_eq!(
        device
            .register("c", Recorder::default(), ClientRole::Ordinary)
            .err(),
        Some(AdcError::NoMemory)
    );

    device.release(first).expect("handler returned");
    let reused = device
        .register("c", Recorder::default(), ClientRole::Ordinary)
        .expect("released slot is reused");
    assert_eq!(device.owner(&reused), Some("c"));
}

#[test]
fn dispatch_routes_the_multiplexer_per_revision() {
    let legacy = probe(Revision::V2);
    let client = register(&legacy, "hwmon", ClientRole::Ordinary);
    legacy
        .start(&client, 5, 1, Completion::Callback)
        .expect("admitted");
    legacy.with_registers(|regs| {
        assert_eq!(regs.selected_channel(Revision::V2), 5);
        assert_eq!(regs.peek(Register::Control) & con::STANDBY, 0);
        assert_ne!(regs.peek(Register::Control) & con::PRESCALER_ENABLE, 0);
        assert_eq!(regs.triggers(), 1);
    });

    let modern = probe(Revision::V3);
    let client = register(&modern, "hwmon", ClientRole::Ordinary);
    modern
        .start(&client, 7, 1, Completion::Callback)
        .expect("admitted");
    modern.with_registers(|regs| {
        assert_eq!(regs.peek(Register::Mux), 7);
        assert_eq!(regs.peek(Register::Control) & con::MUX_MASK, 0);
    });
}

#[test]
fn priority_dispatch_leaves_the_multiplexer_alone() {
    let device = probe(Revision::V3);
    let ts = register(&device, "ts", ClientRole::Priority);
    device.with_registers(|regs| {
        use adc_core::RegisterBlock;
        regs.write(Register::Mux, 3);
    });

    device
        .start(&ts, 0, 1, Completion::Callback)
        .expect("admitted");
    device.with_registers(|regs| assert_eq!(regs.peek(Register::Mux), 3));
    assert_eq!(
        device.with_handler(&ts, |recorder| recorder.selects.clone()),
        Some(vec![true])
    );
}

#[test]
fn idle_device_parks_in_standby() {
    let device = probe(Revision::V2);
    let client = register(&device, "hwmon", ClientRole::Ordinary);
    device
        .start(&client, 0, 1, Completion::Callback)
        .expect("admitted");
    assert!(!device.status().standby);

    fire(&device, 1);

    let status = device.status();
    assert!(status.standby);
    assert!(status.is_idle());
    device.with_registers(|regs| {
        assert_eq!(regs.bank(), Bank::Primary);
        assert_eq!(regs.peek(Register::Control) & con::PRESCALER_ENABLE, 0);
    });
}

#[derive(Debug, Default)]
struct Recorder {
    selects: Vec<bool>,
    samples: Vec<(u16, u16, u32)>,
}

impl ConversionClient for Recorder {
    fn on_select(&mut self, activating: bool) {
        self.selects.push(activating);
    }

    fn on_sample(&mut self, data0: u16, data1: u16, remaining: &mut u32) {
        self.samples.push((data0, data1, *remaining));
    }
}

type TestDevice = Device<HostPlatform, Recorder>;

fn probe(revision: Revision) -> TestDevice {
    Device::probe(HostPlatform::new(), AdcConfig::new(revision)).expect("probe should succeed")
}

fn register(device: &TestDevice, owner: &'static str, role: ClientRole) -> Client {
    device
        .register(owner, Recorder::default(), role)
        .expect("slot available")
}

fn fire(device: &TestDevice, count: usize) {
    for _ in 0..count {
        device.with_registers(|regs| regs.load_sample(0x100, 0x200));
        device.on_interrupt();
    }
}

fn dispatch_order(device: &TestDevice) -> Vec<adc_core::ClientId> {
    device.with_history(|history| history.dispatch_order().collect())
}
