use std::time::{Duration, Instant};

use ym2151_bridge::{
    cleanup_chip, clock_chip, handle_json, init_chip, reset_chip, shared, write_register,
    Ym2151Error,
};

// The engine is process-wide, so the whole lifecycle runs in one test
#[test]
fn process_wide_lifecycle() {
    cleanup_chip();
    assert!(matches!(clock_chip(), Err(Ym2151Error::Uninitialized)));
    assert!(matches!(reset_chip(), Err(Ym2151Error::Uninitialized)));
    assert!(matches!(
        write_register(0x08, 0x00),
        Err(Ym2151Error::Uninitialized)
    ));

    init_chip().unwrap();
    init_chip().unwrap();
    assert!(shared().is_initialized());

    // Power-on engine is silent
    assert_eq!(clock_chip().unwrap(), [0, 0]);

    let start = Instant::now();
    write_register(0x20, 0xC7).unwrap();
    write_register(0x40, 0x01).unwrap();
    write_register(0x80, 0x1F).unwrap();
    write_register(0x28, 0x4A).unwrap();
    write_register(0x08, 0x08).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(shared().with(|b| b.chip().writes_issued()), 5);

    assert!(matches!(
        write_register(256, 0),
        Err(Ym2151Error::InvalidArgument(_))
    ));
    assert!(matches!(
        write_register(0x08, -1),
        Err(Ym2151Error::InvalidArgument(_))
    ));

    let frames: Vec<[i32; 2]> = (0..500).map(|_| clock_chip().unwrap()).collect();
    assert!(frames.iter().any(|[l, _]| *l != 0));
    assert!(frames.iter().all(|[l, r]| l == r));

    assert!(matches!(
        handle_json(r#"{"op":"writeRegister","address":"8","data":0}"#),
        Err(Ym2151Error::InvalidArgument(_))
    ));
    assert_eq!(handle_json(r#"{"op":"resetChip"}"#).unwrap(), "null");
    assert_eq!(handle_json(r#"{"op":"clockChip"}"#).unwrap(), "[0,0]");

    cleanup_chip();
    cleanup_chip();
    assert!(matches!(clock_chip(), Err(Ym2151Error::Uninitialized)));
    assert!(matches!(
        handle_json(r#"{"op":"clockChip"}"#),
        Err(Ym2151Error::Uninitialized)
    ));
}
