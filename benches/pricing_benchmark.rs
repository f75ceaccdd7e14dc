use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hotel_pricing_engine::{
    compute_invoice, is_room_available_for_interval, Adjustments, MealPlan, Reservation,
    ReservationId, ReservationStatus, Room, RoomId, RoomSelection, RoomType,
};
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::collections::HashMap;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

// Back-to-back bookings of random length across `rooms` rooms
fn reservations(rooms: usize, per_room: usize) -> Vec<Reservation> {
    let mut rng = thread_rng();
    let mut all = Vec::with_capacity(rooms * per_room);
    for room in 0..rooms {
        let mut day = start();
        for n in 0..per_room {
            let check_out = day + Duration::days(rng.gen_range(1..7));
            all.push(Reservation {
                id: ReservationId::new(format!("r{}-{}", room, n)),
                room_id: RoomId::new(format!("{}", 100 + room)),
                customer_name: "Bench Guest".to_string(),
                check_in: day,
                check_out,
                adults: 2,
                children: 0,
                status: if rng.gen_bool(0.1) {
                    ReservationStatus::Canceled
                } else {
                    ReservationStatus::Confirmed
                },
                total_amount: 0.0,
                meal_plan_id: None,
            });
            day = check_out + Duration::days(rng.gen_range(0..3));
        }
    }
    all.shuffle(&mut rng);
    all
}

pub fn availability_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_availability");

    for size in [100, 1_000, 10_000].iter() {
        let snapshot = reservations(20, size / 20);
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snapshot| {
            let mut rng = thread_rng();
            b.iter(|| {
                let room = RoomId::new(format!("{}", 100 + rng.gen_range(0..20)));
                let check_in = start() + Duration::days(rng.gen_range(0..365));
                let check_out = check_in + Duration::days(rng.gen_range(1..14));
                black_box(is_room_available_for_interval(
                    &room, check_in, check_out, None, snapshot,
                ))
            });
        });
    }

    group.finish();
}

pub fn pricing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_invoice");

    let rooms: HashMap<_, _> = (0..50)
        .map(|i| {
            let number = format!("{}", 100 + i);
            let room_type = if i % 5 == 0 { "suite" } else { "std" };
            Room::new(number.clone(), number, room_type)
        })
        .map(|r| (r.id.clone(), r))
        .collect();
    let room_types: HashMap<_, _> = [
        RoomType::new("std", "Standard", 89.9, 2),
        RoomType::new("suite", "Suite", 240.0, 4),
    ]
    .into_iter()
    .map(|t| (t.id.clone(), t))
    .collect();
    let meal_plans: HashMap<_, _> =
        [MealPlan::new("hb", "Half Board", 18.5).with_per_room_rate(4.0)]
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
    let ctx = hotel_pricing_engine::PricingContext {
        rooms: &rooms,
        room_types: &room_types,
        meal_plans: &meal_plans,
    };

    for selected in [1, 5, 25].iter() {
        let selections: Vec<RoomSelection> = (0..*selected)
            .map(|i| {
                let s = RoomSelection::new(format!("{}", 100 + i)).unwrap();
                if i % 2 == 0 {
                    s.with_meal_plan("hb")
                } else {
                    s
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(selected), &selections, |b, selections| {
            b.iter(|| {
                black_box(compute_invoice(
                    selections,
                    2,
                    1,
                    start(),
                    start() + Duration::days(5),
                    &ctx,
                    Adjustments::booking(),
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, availability_benchmark, pricing_benchmark);
criterion_main!(benches);
