use anyhow::Result;
use bitcrusher::audio::block::Block;
use bitcrusher::audio::engine::Engine;
use bitcrusher::crusher::{CrusherParams, ParamUpdate, quantization_step, quantize};
use bitcrusher::session::Session;

const BUFFER_SIZE: usize = 128;

fn sine(frames: usize, freq: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / 48_000.0;
            (2.0 * std::f32::consts::PI * freq * t).sin() * 0.7
        })
        .collect()
}

#[test]
fn engine_quantizes_every_channel() -> Result<()> {
    let params = CrusherParams::new(3.0, 1.0);
    let (mut engine, _) = Engine::new(2, params);

    let left = sine(BUFFER_SIZE, 440.0);
    let right = sine(BUFFER_SIZE, 660.0);
    let mut block = Block::from_channels(vec![left.clone(), right.clone()])?;

    engine.process(block.channels_mut())?;

    let step = quantization_step(3);
    for (input, output) in [(&left, 0), (&right, 1)] {
        let output = block.channel(output).unwrap();
        for (x, y) in input.iter().zip(output) {
            assert_eq!(*y, quantize(*x, step));
        }
    }

    Ok(())
}

#[test]
fn engine_hold_spans_block_boundaries() -> Result<()> {
    let params = CrusherParams::new(8.0, 8.0);
    let input = sine(BUFFER_SIZE * 2, 220.0);

    let (mut whole_engine, _) = Engine::new(1, params);
    let mut whole = [input.clone()];
    whole_engine.process(&mut whole)?;

    let (mut split_engine, _) = Engine::new(1, params);
    let mut first = [input[..BUFFER_SIZE].to_vec()];
    let mut second = [input[BUFFER_SIZE..].to_vec()];
    split_engine.process(&mut first)?;
    split_engine.process(&mut second)?;

    assert_eq!(whole[0][..BUFFER_SIZE], first[0][..]);
    assert_eq!(whole[0][BUFFER_SIZE..], second[0][..]);

    // 128 is not a multiple of 3, so a per-block phase restart would show up here
    let params = CrusherParams::new(8.0, 3.0);
    let (mut engine, _) = Engine::new(1, params);
    let mut first = [input[..BUFFER_SIZE].to_vec()];
    let mut second = [input[BUFFER_SIZE..].to_vec()];
    engine.process(&mut first)?;
    engine.process(&mut second)?;
    assert_eq!(second[0][0], first[0][BUFFER_SIZE - 1]);

    Ok(())
}

#[test]
fn engine_picks_up_params_at_next_block() -> Result<()> {
    let (mut engine, handle) = Engine::new(1, CrusherParams::new(16.0, 1.0));

    let mut block = [vec![0.3f32; BUFFER_SIZE]];
    engine.process(&mut block)?;
    assert!(block[0].iter().all(|&x| (x - 0.3).abs() < 1e-4));

    let live = handle.update(&ParamUpdate::bit_depth(1.0));
    assert_eq!(live.bit_depth(), 1);
    assert_eq!(live.downsample(), 1);

    let mut block = [vec![0.3f32; BUFFER_SIZE]];
    engine.process(&mut block)?;
    assert!(block[0].iter().all(|&x| x == 0.0));

    Ok(())
}

#[test]
fn engine_accepts_empty_blocks() -> Result<()> {
    let (mut engine, _) = Engine::new(2, CrusherParams::new(8.0, 4.0));

    let mut no_channels: Vec<Vec<f32>> = Vec::new();
    engine.process(&mut no_channels)?;

    let mut no_frames = vec![Vec::<f32>::new(), Vec::new()];
    engine.process(&mut no_frames)?;

    assert!(engine.crusher().states().iter().all(|s| s.phase() == 0));

    Ok(())
}

#[test]
fn engine_rejects_mismatched_blocks() -> Result<()> {
    let (mut engine, _) = Engine::new(2, CrusherParams::default());

    let mut mono = vec![vec![0.5f32; BUFFER_SIZE]];
    assert!(
        engine.process(&mut mono).is_err(),
        "expected error when channel count does not match"
    );
    assert_eq!(mono[0], vec![0.5f32; BUFFER_SIZE]);

    let mut ragged = vec![vec![0.5f32; BUFFER_SIZE], vec![0.5f32; BUFFER_SIZE / 2]];
    assert!(
        engine.process(&mut ragged).is_err(),
        "expected error when channels have unequal lengths"
    );

    let mut first_empty = vec![Vec::new(), vec![0.3f32; 4]];
    assert!(
        engine.process(&mut first_empty).is_err(),
        "expected error when only the first channel is empty"
    );
    assert_eq!(first_empty[1], [0.3f32; 4]);

    Ok(())
}

#[test]
fn engine_reconfigures_between_blocks() -> Result<()> {
    let (mut engine, handle) = Engine::new(1, CrusherParams::new(8.0, 2.0));

    let mut mono = [vec![0.25f32; BUFFER_SIZE]];
    engine.process(&mut mono)?;

    handle.reconfigure(2)?;
    let mut stereo = [vec![0.25f32; BUFFER_SIZE], vec![-0.25f32; BUFFER_SIZE]];
    engine.process(&mut stereo)?;

    assert_eq!(engine.channels(), 2);
    assert!(stereo[1].iter().all(|&x| x == -0.25));
    assert!(
        engine
            .crusher()
            .states()
            .iter()
            .all(|s| s.phase() == BUFFER_SIZE as u64)
    );

    // The mono crusher is handed back rather than freed by the engine
    assert_eq!(handle.reclaim(), 1);
    assert_eq!(handle.reclaim(), 0);

    Ok(())
}

#[test]
fn concurrent_updates_keep_both_fields() {
    const ITERATIONS: usize = 1000;

    let (_engine, handle) = Engine::new(1, CrusherParams::new(16.0, 1.0));

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..ITERATIONS {
                handle.update(&ParamUpdate::bit_depth(4.0));
            }
        });
        s.spawn(|| {
            for _ in 0..ITERATIONS {
                handle.update(&ParamUpdate::downsample(6.0));
            }
        });
    });

    let live = handle.params();
    assert_eq!(live.bit_depth(), 4);
    assert_eq!(live.downsample(), 6);
}

#[test]
fn session_enable_starts_fresh_pipeline() -> Result<()> {
    let params = CrusherParams::new(16.0, 4.0);
    let (mut session, mut engine) = Session::new(1, params);
    session.enable()?;

    let mut block = [vec![0.1f32, 0.2, 0.3]];
    engine.process(&mut block)?;
    assert_eq!(engine.crusher().states()[0].phase(), 3);

    session.disable()?;
    session.enable()?;

    let mut block = [vec![0.4f32, 0.5, 0.6, 0.7, 0.8]];
    engine.process(&mut block)?;

    let q = |x: f32| quantize(x, params.step());
    assert_eq!(block[0], [q(0.4), q(0.4), q(0.4), q(0.4), q(0.8)]);

    session.close()?;
    Ok(())
}

#[test]
fn session_params_are_shared_by_all_channels() -> Result<()> {
    let (mut session, mut engine) = Session::new(3, CrusherParams::default());
    session.enable()?;
    session.set_params(&ParamUpdate {
        bit_depth: Some(2.0),
        downsample_factor: Some(0.0),
    });

    let mut block = vec![vec![0.6f32; 16]; 3];
    engine.process(&mut block)?;

    for channel in &block {
        assert!(channel.iter().all(|&x| x == 0.5));
    }

    Ok(())
}
