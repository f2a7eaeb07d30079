// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![no_main]
#![no_std]

use core::cell::RefCell;

use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use critical_section::Mutex;
use panic_halt as _;
#[cfg(feature = "defmt")]
use defmt_rtt as _;

use hal::{
    pac::{self, interrupt},
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use hovercar::calibration::MemoryStore;
use hovercar::config::{DEBUG_BAUD, DELAY_IN_MAIN_LOOP, SERIAL_BUFFER_SIZE, USART3_BAUD};
use hovercar::hw::{RxLink, Usart};
use hovercar::protocol::RxRing;
use hovercar::{DriveCore, TickInputs};

/// Scope line every this many ticks.
const SCOPE_DIVIDER: u32 = 50;

static RX3: Mutex<RefCell<Option<RxLink<pac::USART3>>>> = Mutex::new(RefCell::new(None));
static RING3: Mutex<RefCell<RxRing<SERIAL_BUFFER_SIZE>>> =
    Mutex::new(RefCell::new(RxRing::new()));

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let mut delay = cortex_m::delay::Delay::new(cp.SYST, clocks.sysclk().to_Hz());

    // GPIO
    let gpioa = dp.GPIOA.split();
    let gpiob = dp.GPIOB.split();

    let power_button = gpioa.pa1.into_pull_down_input();
    let cruise_button = gpioa.pa2.into_pull_up_input();
    let mut power_latch = gpioa.pa5.into_push_pull_output();
    power_latch.set_high();

    // USART1 (DBG)
    let tx = gpioa.pa9.into_alternate::<7>();
    let rx = gpioa.pa10.into_alternate::<7>();
    let dbg_cfg = Config {
        baud_rate: DEBUG_BAUD.bps(),
        ..Default::default()
    };
    let mut usart = Usart::new(Serial::new(dp.USART1, (tx, rx), &clocks, dbg_cfg));

    // USART3 (control link)
    let tx3 = gpiob.pb10.into_alternate::<7>();
    let rx3 = gpiob.pb11.into_alternate::<7>();
    let link_cfg = Config {
        baud_rate: USART3_BAUD.bps(),
        ..Default::default()
    };
    let link = RxLink::new(Serial::new(dp.USART3, (tx3, rx3), &clocks, link_cfg));
    critical_section::with(|cs| RX3.borrow_ref_mut(cs).replace(link));
    unsafe { NVIC::unmask(pac::Interrupt::USART3) };

    // TODO: back the calibration store with the flash EEPROM emulation pages.
    let mut store = MemoryStore::<16>::new();

    let mut core = match DriveCore::with_store(hovercar::Config::default(), &store) {
        Ok(core) => core,
        Err(e) => {
            hovercar::log_error!("config rejected: {}", e);
            usart.println("-- Config rejected --");
            loop {
                cortex_m::asm::wfi();
            }
        }
    };
    usart.println("-- Hovercar ready --");

    let mut now_ms: u32 = 0;
    let mut ticks: u32 = 0;
    let mut ring = [0u8; SERIAL_BUFFER_SIZE];

    loop {
        let pos = critical_section::with(|cs| {
            let r = RING3.borrow_ref(cs);
            ring.copy_from_slice(r.as_slice());
            r.write_pos()
        });
        core.poll_control(&ring, pos);

        let out = core.tick(&TickInputs {
            power_button: power_button.is_high(),
            cruise_button: cruise_button.is_low(),
            now_ms,
            ..TickInputs::default()
        });

        if out.power_off {
            usart.println("-- Motors disabled --");
            if let Err(e) = core.save_calibration(&mut store) {
                hovercar::log_error!("calibration not saved: {}", e);
            }
            usart.flush();
            power_latch.set_low();
            loop {
                cortex_m::asm::wfi();
            }
        }

        if ticks % SCOPE_DIVIDER == 0 {
            usart.scope(&core.scope());
        }

        ticks = ticks.wrapping_add(1);
        now_ms = now_ms.wrapping_add(DELAY_IN_MAIN_LOOP);
        delay.delay_ms(DELAY_IN_MAIN_LOOP);
    }
}

#[interrupt]
fn USART3() {
    critical_section::with(|cs| {
        if let Some(link) = RX3.borrow_ref_mut(cs).as_mut() {
            link.drain(&mut RING3.borrow_ref_mut(cs));
        }
    });
}
