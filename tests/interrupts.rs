mod common;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use zbswitch::hal::{Edge, TaskId};
use zbswitch::interrupts::{Dispatcher, PinEvent, SETTLE_TRIES};

use common::{Sim, pin};

#[derive(Debug, Default)]
struct Log {
    events: Vec<(PinEvent, usize)>,
}

fn log(ctx: &mut Log, event: PinEvent, param: usize) {
    ctx.events.push((event, param));
}

/// Feed one edge and run every task that falls due.
fn burst(sim: &mut Sim, dispatcher: &mut Dispatcher<Log>, ctx: &mut Log) {
    dispatcher.on_edge_interrupt(sim);
    sim.run_for(20, |sim, task| {
        assert_eq!(task, TaskId::GpioDispatch);
        dispatcher.on_dispatch_task(sim, ctx);
    });
}

#[test]
fn test_one_dispatch_per_burst() {
    let mut sim = Sim::new();
    let mut ctx = Log::default();
    let mut dispatcher = Dispatcher::new();
    sim.levels.insert(pin("B0"), true);
    dispatcher.register(&mut sim, pin("B0"), log, 0).unwrap();
    dispatcher.register(&mut sim, pin("B1"), log, 1).unwrap();
    assert_eq!(sim.edges.get(&pin("B0")), Some(&Edge::Falling));
    assert_eq!(sim.edges.get(&pin("B1")), Some(&Edge::Rising));

    // The contact closes and bounces; the dispatcher sees only the first edge
    // because it disables every pin interrupt straight away.
    assert!(sim.set_input(pin("B0"), false));
    dispatcher.on_edge_interrupt(&mut sim);
    assert!(!sim.set_input(pin("B0"), true));
    assert!(!sim.set_input(pin("B0"), false));

    sim.run_for(20, |sim, task| {
        assert_eq!(task, TaskId::GpioDispatch);
        dispatcher.on_dispatch_task(sim, &mut ctx);
    });

    assert_eq!(dispatcher.dispatches(), 1);
    assert_eq!(ctx.events.len(), 2);
    assert_eq!(ctx.events[0], (PinEvent { pin: pin("B0"), high: false }, 0));
    assert_eq!(ctx.events[1], (PinEvent { pin: pin("B1"), high: false }, 1));
    assert_eq!(sim.edges.get(&pin("B0")), Some(&Edge::Rising));
    assert_eq!(sim.irq_enabled.get(&pin("B0")), Some(&true));
}

#[test]
fn test_converges_on_settled_level() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let mut sim = Sim::new();
        let mut ctx = Log::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&mut sim, pin("C4"), log, 9).unwrap();

        // Alternating bounce shorter than the retry ceiling, ending on the
        // settled level.
        let settled: bool = rng.gen_range(0..2) == 1;
        let flips = rng.gen_range(0..usize::from(SETTLE_TRIES) - 2);
        let script = sim.bounce.entry(pin("C4")).or_default();
        for i in (0..=flips).rev() {
            script.push_back(settled ^ (i % 2 == 1));
        }

        burst(&mut sim, &mut dispatcher, &mut ctx);

        assert_eq!(ctx.events.len(), 1);
        assert_eq!(ctx.events[0].0.high, settled);
        let expected = if settled { Edge::Falling } else { Edge::Rising };
        assert_eq!(sim.edges.get(&pin("C4")), Some(&expected));
    }
}

#[test]
fn test_endless_bounce_still_dispatches() {
    let mut sim = Sim::new();
    let mut ctx = Log::default();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(&mut sim, pin("A3"), log, 0).unwrap();
    let script = sim.bounce.entry(pin("A3")).or_default();
    for i in 0..500 {
        script.push_back(i % 2 == 0);
    }

    burst(&mut sim, &mut dispatcher, &mut ctx);
    assert_eq!(ctx.events.len(), 1);
    assert_eq!(sim.irq_enabled.get(&pin("A3")), Some(&true));
}

#[test]
fn test_unregister_mid_burst() {
    let mut sim = Sim::new();
    let mut ctx = Log::default();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(&mut sim, pin("A0"), log, 0).unwrap();
    dispatcher.register(&mut sim, pin("A1"), log, 1).unwrap();

    dispatcher.on_edge_interrupt(&mut sim);
    assert!(dispatcher.unregister(&mut sim, pin("A0")));
    sim.run_for(20, |sim, _| dispatcher.on_dispatch_task(sim, &mut ctx));

    assert_eq!(ctx.events.len(), 1);
    assert_eq!(ctx.events[0].1, 1);
    assert_eq!(sim.irq_enabled.get(&pin("A0")), Some(&false));
    assert!(!dispatcher.is_registered(pin("A0")));
}

#[test]
fn test_delay_varies_between_bursts() {
    let mut sim = Sim::new();
    let mut ctx = Log::default();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(&mut sim, pin("D1"), log, 0).unwrap();

    let mut delays = Vec::new();
    for _ in 0..6 {
        dispatcher.on_edge_interrupt(&mut sim);
        delays.push(sim.pending(TaskId::GpioDispatch).unwrap());
        sim.run_for(20, |sim, _| dispatcher.on_dispatch_task(sim, &mut ctx));
    }
    assert_eq!(delays[..3], [3, 2, 6]);
    delays.sort_unstable();
    assert_eq!(delays, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(ctx.events.len(), 6);
}
