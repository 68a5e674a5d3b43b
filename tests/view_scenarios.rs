use ndview::convert::fill;
use ndview::{argb_channel, Argb, Boundary, Buffer, FunctionView, Interval, Layout, View, ViewExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Deserialize)]
struct BoundaryCase {
    policy: String,
    pos: i64,
    expected: u8,
}

fn boundary_from_name(name: &str) -> Boundary<u8> {
    match name {
        "zero" => Boundary::Zero,
        "mirror" => Boundary::Mirror,
        "reflect" => Boundary::Reflect,
        "periodic" => Boundary::Periodic,
        "value" => Boundary::Value(9),
        other => panic!("unknown boundary {other}"),
    }
}

#[test]
fn centre_of_materialized_ramp_is_twelve() {
    let ramp = Buffer::<u8>::from_vec((0..25).collect(), &[5, 5]).unwrap();
    let copy = ramp.materialize(Buffer::interval(&ramp), Layout::Array).unwrap();
    assert_eq!(copy.get(&[2, 2]).unwrap(), 12);
    assert_eq!(ndview::ops::center_value(&copy).unwrap(), 12);
}

#[test]
fn mirror_repeats_the_edge_sample() {
    let line = Buffer::<u8>::from_vec(vec![1, 2, 3], &[3]).unwrap();
    let mirrored = line.extend(Boundary::Mirror).unwrap();
    assert_eq!(mirrored.get(&[-1]).unwrap(), 1);
}

#[test]
fn boundary_policies_on_a_short_line() {
    let cases: Vec<BoundaryCase> = serde_json::from_value(json!([
        { "policy": "zero", "pos": -1, "expected": 0 },
        { "policy": "zero", "pos": 1, "expected": 2 },
        { "policy": "value", "pos": 5, "expected": 9 },
        { "policy": "mirror", "pos": -1, "expected": 1 },
        { "policy": "mirror", "pos": -2, "expected": 2 },
        { "policy": "mirror", "pos": 3, "expected": 3 },
        { "policy": "mirror", "pos": 4, "expected": 2 },
        { "policy": "mirror", "pos": 11, "expected": 1 },
        { "policy": "reflect", "pos": -1, "expected": 2 },
        { "policy": "reflect", "pos": -2, "expected": 3 },
        { "policy": "reflect", "pos": 3, "expected": 2 },
        { "policy": "reflect", "pos": 4, "expected": 1 },
        { "policy": "periodic", "pos": -1, "expected": 3 },
        { "policy": "periodic", "pos": 3, "expected": 1 },
        { "policy": "periodic", "pos": -7, "expected": 3 }
    ]))
    .unwrap();

    let line = Buffer::<u8>::from_vec(vec![1, 2, 3], &[3]).unwrap();
    for case in cases {
        let extended = (&line).extend(boundary_from_name(&case.policy)).unwrap();
        assert_eq!(
            extended.get(&[case.pos]).unwrap(),
            case.expected,
            "{} at {}",
            case.policy,
            case.pos
        );
    }
}

#[test]
fn extended_views_agree_with_source_inside() {
    let data: Vec<u8> = (0..35).map(|v| (v * 7 % 31) as u8).collect();
    let image = Buffer::from_vec(data, &[7, 5]).unwrap();
    for boundary in [
        Boundary::Zero,
        Boundary::Mirror,
        Boundary::Reflect,
        Boundary::Periodic,
        Boundary::Value(200),
    ] {
        let extended = (&image).extend(boundary).unwrap();
        assert!(extended.bounds().is_none());
        for (pos, &v) in image.iter() {
            assert_eq!(extended.get(&pos).unwrap(), v);
        }
    }
}

#[test]
fn zeroing_red_keeps_other_channels() {
    let pixels: Vec<Argb> = (0..12u8)
        .map(|i| Argb::rgba(10 + i, 100 + i, 200 - i, 255 - i))
        .collect();
    let mut image = Buffer::from_vec(pixels.clone(), &[4, 3]).unwrap();
    {
        let mut red = argb_channel(&mut image, 1).unwrap();
        fill(&mut red, 0).unwrap();
    }
    for (after, before) in image.values().zip(&pixels) {
        assert_eq!(after.red(), 0);
        assert_eq!(after.green(), before.green());
        assert_eq!(after.blue(), before.blue());
        assert_eq!(after.alpha(), before.alpha());
    }
}

#[test]
fn read_only_converter_rejects_writes() {
    use ndview::WritableView;

    let mut image = Buffer::<u8>::from_vec(vec![1, 2, 3, 4], &[2, 2]).unwrap();
    let mut doubled = (&mut image).convert(|v: u8| v * 2);
    assert_eq!(doubled.get(&[1, 1]).unwrap(), 8);
    assert!(matches!(
        doubled.set(&[0, 0], 5),
        Err(ndview::NdViewError::InvalidWrite { .. })
    ));
    assert_eq!(image.get(&[0, 0]).unwrap(), 1);
}

#[test]
fn converters_are_evaluated_on_every_read() {
    let calls = AtomicUsize::new(0);
    let source = FunctionView::new(2, |pos: &[i64]| (pos[0] * 10 + pos[1]) as i32);
    let counted = source.convert(|v: i32| {
        calls.fetch_add(1, Ordering::Relaxed);
        v + 1
    });
    assert_eq!(counted.get(&[3, 4]).unwrap(), 35);
    assert_eq!(counted.get(&[3, 4]).unwrap(), 35);
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn chained_transforms_compose() {
    let image = Buffer::<i32>::from_vec((0..12).collect(), &[4, 3]).unwrap();
    let shifted = (&image).translate(&[10, -2]).unwrap();
    assert_eq!(shifted.bounds().unwrap(), &Interval::new(vec![10, -2], vec![13, 0]).unwrap());
    assert_eq!(shifted.get(&[11, -1]).unwrap(), image.get(&[1, 1]).unwrap());

    let swapped = (&image).permute(0, 1).unwrap();
    assert_eq!(swapped.get(&[2, 3]).unwrap(), image.get(&[3, 2]).unwrap());

    let column = (&image).hyperslice(0, 2).unwrap();
    assert_eq!(column.num_dims(), 1);
    assert_eq!(column.get(&[1]).unwrap(), 6);

    let inside = ViewExt::interval(&image, Interval::new(vec![1, 1], vec![2, 2]).unwrap()).unwrap();
    assert!(inside.get(&[0, 0]).is_err());
    assert_eq!(inside.collect().unwrap().to_flat_vec(), vec![5, 6, 9, 10]);
}
