// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::prelude::*;
use alloy_primitives::Address;
use anyhow::{bail, Result};
use cc_config::CycleConfig;
use cc_cycle::{
    setup_cycle, setup_datastore, BfvCycleActor, CallContext, Cycle, CycleActor, CycleHistory,
    CycleRepositoryFactory, CurrentPhase, DeliverReveal, ErrorKind, GetAggregate,
    GetPendingReveals, GetProfile, GetStatistic, HasSubmitted, IsTokenConsumed, PerformAnalysis,
    Phase, RequestResult, StartRound, Submit, VerifyIdentity,
};
use cc_data::RepositoriesFactory;
use cc_events::{
    CycleEvent, EventBus, FailureType, GetErrors, RequestId, RevealFulfilled, RevealProof,
    RoundId,
};
use cc_fhe::{BfvHandleService, Principal, RevealFulfiller};
use cc_logger::SimpleLogger;
use cc_test_helpers::{
    alice, authority, bob, init_tracing, seeded_handle_service, test_config, token, HOUR,
};
use std::time::Duration;
use tokio::time::sleep;

fn as_authority(now: u64) -> CallContext {
    CallContext::new(authority(), now)
}

async fn verify(addr: &Addr<BfvCycleActor>, identities: &[Address]) -> Result<()> {
    for identity in identities {
        addr.send(VerifyIdentity {
            ctx: as_authority(0),
            identity: *identity,
        })
        .await??;
    }
    Ok(())
}

async fn submit(
    addr: &Addr<BfvCycleActor>,
    who: Address,
    now: u64,
    value: u64,
    metric: u32,
    n: u8,
) -> Result<(), cc_cycle::CycleError> {
    addr.send(Submit {
        ctx: CallContext::new(who, now),
        value,
        metric,
        token: token(n),
    })
    .await
    .map_err(|e| cc_cycle::CycleError::Internal(e.to_string()))?
    .map(|_| ())
}

/// Poll until the statistic of `round` has been derived.
async fn wait_for_statistic(addr: &Addr<BfvCycleActor>, round: RoundId) -> Result<()> {
    for _ in 0..100 {
        match addr.send(GetStatistic(round)).await? {
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::PendingExternal => {
                sleep(Duration::from_millis(10)).await
            }
            Err(err) => bail!(err),
        }
    }
    bail!("statistic for round {} was never derived", round)
}

/// Cycle actor without a reveal responder, so reveal callbacks are under the test's control.
async fn manual_cycle(
    config: &CycleConfig,
    bus: &Addr<EventBus<CycleEvent>>,
) -> Result<(Addr<BfvCycleActor>, BfvHandleService)> {
    let service = seeded_handle_service(11)?;
    let store = setup_datastore(config, bus)?;
    let cycle = Cycle::from_config(service.clone(), config)?;
    let addr = CycleActor::attach(bus, cycle, &store.repositories().cycle()).await?;
    Ok((addr, service))
}

#[actix::test]
async fn single_participant_round() -> Result<()> {
    let _guard = init_tracing();
    let bus = EventBus::<CycleEvent>::new().start();
    SimpleLogger::<CycleEvent>::attach("cycle", bus.clone());
    let (addr, service) = setup_cycle(&test_config(), &bus).await?;

    verify(&addr, &[alice(), bob()]).await?;
    addr.send(StartRound {
        ctx: as_authority(0),
    })
    .await??;

    submit(&addr, alice(), HOUR, 1000, 85, 0xA1).await?;
    assert!(
        addr.send(HasSubmitted {
            identity: alice(),
            round: None
        })
        .await??
    );

    let err = submit(&addr, alice(), 2 * HOUR, 1000, 85, 0xA2)
        .await
        .expect_err("second submission");
    assert_eq!(err.kind(), ErrorKind::AlreadyDone);

    let err = submit(&addr, bob(), 7 * HOUR, 10, 10, 0xB1)
        .await
        .expect_err("window closed");
    assert_eq!(err.kind(), ErrorKind::PhaseViolation);
    assert!(!addr.send(IsTokenConsumed(token(0xB1))).await??);

    let outcome = addr
        .send(PerformAnalysis {
            ctx: as_authority(8 * HOUR),
            round: None,
        })
        .await??;
    assert_eq!(outcome.completed.participant_count, 1);
    assert_eq!(
        addr.send(CurrentPhase { now: 8 * HOUR }).await??,
        Some(Phase::Submission)
    );

    wait_for_statistic(&addr, RoundId(1)).await?;
    let statistic = addr.send(GetStatistic(RoundId(1))).await??;
    assert_eq!(service.decrypt_for(&Principal::System, &statistic)?, 85);

    let aggregate = addr.send(GetAggregate(RoundId(1))).await??;
    assert_eq!(service.decrypt_for(&Principal::System, &aggregate)?, 1000);

    let summary = addr
        .send(CycleHistory {
            round: RoundId(1),
            now: 9 * HOUR,
        })
        .await??;
    assert!(summary.analysis_completed);
    assert!(summary.statistic_available);
    assert_eq!(summary.participant_count, 1);

    let profile = addr.send(GetProfile(alice())).await??;
    assert_eq!(profile.submissions, 1);
    Ok(())
}

#[actix::test]
async fn two_participants_share_the_result() -> Result<()> {
    let bus = EventBus::<CycleEvent>::new().start();
    let (addr, service) = setup_cycle(&test_config(), &bus).await?;

    verify(&addr, &[alice(), bob()]).await?;
    addr.send(StartRound {
        ctx: as_authority(0),
    })
    .await??;
    submit(&addr, alice(), HOUR, 1000, 80, 1).await?;
    submit(&addr, bob(), 2 * HOUR, 2000, 90, 2).await?;

    addr.send(PerformAnalysis {
        ctx: as_authority(7 * HOUR),
        round: None,
    })
    .await??;
    wait_for_statistic(&addr, RoundId(1)).await?;

    let granted = addr
        .send(RequestResult {
            round: RoundId(1),
            identity: alice(),
        })
        .await??;
    assert!(granted.statistic_included);

    let reader = Principal::Identity(alice());
    let aggregate = addr.send(GetAggregate(RoundId(1))).await??;
    let statistic = addr.send(GetStatistic(RoundId(1))).await??;
    assert_eq!(service.decrypt_for(&reader, &aggregate)?, 3000);
    assert_eq!(service.decrypt_for(&reader, &statistic)?, 85);
    assert!(service
        .decrypt_for(&Principal::Identity(bob()), &statistic)
        .is_err());
    Ok(())
}

#[actix::test]
async fn stalled_reveal_leaves_statistic_pending() -> Result<()> {
    let bus = EventBus::<CycleEvent>::new().start();
    let (addr, service) = manual_cycle(&test_config(), &bus).await?;

    verify(&addr, &[alice()]).await?;
    addr.send(StartRound {
        ctx: as_authority(0),
    })
    .await??;
    submit(&addr, alice(), HOUR, 5, 40, 1).await?;
    let outcome = addr
        .send(PerformAnalysis {
            ctx: as_authority(8 * HOUR),
            round: None,
        })
        .await??;

    let err = addr
        .send(GetStatistic(RoundId(1)))
        .await?
        .expect_err("reveal outstanding");
    assert_eq!(err.kind(), ErrorKind::PendingExternal);
    let summary = addr
        .send(CycleHistory {
            round: RoundId(1),
            now: 30 * HOUR,
        })
        .await??;
    assert!(summary.analysis_completed);
    assert!(!summary.statistic_available);

    // Rounds keep moving while the reveal is stalled.
    submit(&addr, alice(), 9 * HOUR, 6, 60, 2).await?;

    let (total, proof) = service.fulfil(outcome.reveal.request_id)?;
    addr.send(DeliverReveal {
        request_id: outcome.reveal.request_id,
        plaintext: total,
        proof,
    })
    .await??;
    let statistic = addr.send(GetStatistic(RoundId(1))).await??;
    assert_eq!(service.decrypt_for(&Principal::System, &statistic)?, 40);
    Ok(())
}

#[actix::test]
async fn overlapping_reveals_complete_out_of_order() -> Result<()> {
    let bus = EventBus::<CycleEvent>::new().start();
    let (addr, service) = manual_cycle(&test_config(), &bus).await?;

    verify(&addr, &[alice(), bob()]).await?;
    addr.send(StartRound {
        ctx: as_authority(0),
    })
    .await??;
    submit(&addr, alice(), HOUR, 1, 20, 1).await?;
    let first = addr
        .send(PerformAnalysis {
            ctx: as_authority(7 * HOUR),
            round: None,
        })
        .await??;

    submit(&addr, bob(), 8 * HOUR, 2, 90, 2).await?;
    let second = addr
        .send(PerformAnalysis {
            ctx: as_authority(14 * HOUR),
            round: None,
        })
        .await??;
    assert_eq!(second.completed.round_id, RoundId(2));
    assert_eq!(addr.send(GetPendingReveals).await??.len(), 2);

    for outcome in [&second, &first] {
        let (total, proof) = service.fulfil(outcome.reveal.request_id)?;
        bus.send(CycleEvent::from(RevealFulfilled {
            round_id: outcome.reveal.round_id,
            request_id: outcome.reveal.request_id,
            plaintext: total,
            proof,
        }))
        .await?;
    }

    wait_for_statistic(&addr, RoundId(1)).await?;
    wait_for_statistic(&addr, RoundId(2)).await?;
    let one = addr.send(GetStatistic(RoundId(1))).await??;
    let two = addr.send(GetStatistic(RoundId(2))).await??;
    assert_eq!(service.decrypt_for(&Principal::System, &one)?, 20);
    assert_eq!(service.decrypt_for(&Principal::System, &two)?, 90);
    assert!(addr.send(GetPendingReveals).await??.is_empty());
    Ok(())
}

#[actix::test]
async fn forged_reveals_are_reported_on_the_bus() -> Result<()> {
    let bus = EventBus::<CycleEvent>::new().start();
    let errors = EventBus::<CycleEvent>::error(&bus);
    let (addr, _service) = manual_cycle(&test_config(), &bus).await?;

    verify(&addr, &[alice()]).await?;
    addr.send(StartRound {
        ctx: as_authority(0),
    })
    .await??;
    submit(&addr, alice(), HOUR, 1, 1, 1).await?;
    let outcome = addr
        .send(PerformAnalysis {
            ctx: as_authority(7 * HOUR),
            round: None,
        })
        .await??;

    bus.send(CycleEvent::from(RevealFulfilled {
        round_id: RoundId(1),
        request_id: outcome.reveal.request_id,
        plaintext: 1,
        proof: RevealProof([9; 32]),
    }))
    .await?;
    bus.send(CycleEvent::from(RevealFulfilled {
        round_id: RoundId(1),
        request_id: RequestId(999),
        plaintext: 1,
        proof: RevealProof([9; 32]),
    }))
    .await?;

    let mut reported = vec![];
    for _ in 0..100 {
        reported = errors.send(GetErrors::<CycleEvent>::new()).await?;
        if reported.len() == 2 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(reported.len(), 2);
    assert!(reported.iter().all(|e| e.err_type == FailureType::Reveal));

    let err = addr
        .send(GetStatistic(RoundId(1)))
        .await?
        .expect_err("forged reveal rejected");
    assert_eq!(err.kind(), ErrorKind::PendingExternal);
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn state_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = CycleConfig {
        in_mem_store: false,
        data_dir: Some(dir.path().to_path_buf()),
        ..test_config()
    };
    let service = seeded_handle_service(3)?;

    let bus = EventBus::<CycleEvent>::new().start();
    let store = setup_datastore(&config, &bus)?;
    let repo = store.repositories().cycle();
    let cycle = Cycle::from_config(service.clone(), &config)?;
    let addr = CycleActor::attach(&bus, cycle, &repo).await?;

    verify(&addr, &[alice()]).await?;
    addr.send(StartRound {
        ctx: as_authority(0),
    })
    .await??;
    submit(&addr, alice(), HOUR, 12, 34, 7).await?;
    // reads queue behind the actor's writes on the same store
    let stored = repo.read().await?;
    assert!(stored.is_some());

    let bus = EventBus::<CycleEvent>::new().start();
    let store = setup_datastore(&config, &bus)?;
    let cycle = Cycle::from_config(service.clone(), &config)?;
    let restarted = CycleActor::attach(&bus, cycle, &store.repositories().cycle()).await?;

    assert!(
        restarted
            .send(HasSubmitted {
                identity: alice(),
                round: Some(RoundId(1))
            })
            .await??
    );
    assert!(restarted.send(IsTokenConsumed(token(7))).await??);
    let err = submit(&restarted, alice(), 2 * HOUR, 1, 1, 8)
        .await
        .expect_err("already submitted before restart");
    assert_eq!(err.kind(), ErrorKind::AlreadyDone);

    let profile = restarted.send(GetProfile(alice())).await??;
    let reputation = profile.reputation.expect("reputation stored");
    assert_eq!(
        service.decrypt_for(&Principal::Identity(alice()), &reputation)?,
        50
    );
    Ok(())
}
