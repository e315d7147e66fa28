#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod backup;
mod clock;
mod dht22;
mod oled;
mod serial;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [SPI3])]
mod app {
    use super::*;
    use core::cell::RefCell;

    use critical_section::Mutex;
    use defmt::{error, info, warn};
    use embassy_stm32::gpio::{Level, Output, OutputOpenDrain, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::rcc::{Hse, HseMode, LsConfig, LseConfig, LseMode};
    use embassy_stm32::rtc::{Rtc, RtcConfig};
    use embassy_stm32::time::Hertz;
    use embassy_stm32::usart::{self, Uart, UartTx};
    use envlog_core::display::TERMINAL_16X8;
    use envlog_core::sensor::{NoSensor, SensorBank};
    use envlog_core::{Parts, Station, StationConfig, Step};
    use static_cell::StaticCell;

    use backup::BackupStore;
    use clock::{MonoUptime, RtcCounter, SharedRtc};
    use dht22::Dht22;
    use oled::OledTerminal;
    use serial::{ConsoleUart, OpenLog};

    /// Main loop period
    const TICK_MS: u64 = 10;
    const CONSOLE_BAUD: u32 = 115_200;
    /// OpenLog factory default
    const OPENLOG_BAUD: u32 = 9_600;

    type Logger = Station<
        RtcCounter,
        MonoUptime,
        BackupStore,
        SensorBank<Dht22<OutputOpenDrain<'static>>, NoSensor>,
        OledTerminal,
        OpenLog,
        ConsoleUart,
        Output<'static>,
    >;

    static RTC: StaticCell<SharedRtc> = StaticCell::new();

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        station: Logger,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Environmental logger starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE, 32.768 kHz LSE (PC14/PC15)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / 6 = 2 MHz, * 168 = 336 MHz (VCO), / 4 = 84 MHz (SYSCLK)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: None,
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        config.rcc.ls = LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz(32_768),
                mode: LseMode::Oscillator(embassy_stm32::rcc::LseDrive::MediumHigh),
            }),
        };

        let p = embassy_stm32::init(config);

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let rtc: &'static SharedRtc = RTC.init(Mutex::new(RefCell::new(Rtc::new(
            p.RTC,
            RtcConfig::default(),
        ))));
        info!("Internal RTC initialized with LSE");

        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = Hertz(400_000);
        let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c_config);
        let display = OledTerminal::new(i2c);

        // A port that fails to come up is left out; the station keeps running
        let mut console_config = usart::Config::default();
        console_config.baudrate = CONSOLE_BAUD;
        let console = match Uart::new_blocking(p.USART3, p.PB11, p.PB10, console_config) {
            Ok(uart) => Some(uart.split()),
            Err(e) => {
                error!("Console UART init failed: {}", e);
                None
            }
        };

        let mut log_config = usart::Config::default();
        log_config.baudrate = OPENLOG_BAUD;
        let log = UartTx::new_blocking(p.UART4, p.PA0, log_config)
            .map_err(|e| error!("OpenLog UART init failed: {}", e))
            .ok();

        let station_config = StationConfig::default().with_layout(TERMINAL_16X8);

        // Open drain with the sensor's pull-up: high releases the line.
        // The RTC has no temperature sensor to offer as the alternate.
        let dht = Dht22::new(OutputOpenDrain::new(p.PC7, Level::High, Speed::Low), clock::micros);
        let sensors = SensorBank::new(dht, NoSensor, station_config.sources);
        let led = Output::new(p.PC1, Level::Low, Speed::Low);

        let station = Station::new(
            Parts {
                rtc: RtcCounter::new(rtc),
                uptime: MonoUptime,
                store: BackupStore::new(rtc),
                sensors,
                display,
                log: OpenLog::new(log),
                console: ConsoleUart::new(console),
                fault: led,
            },
            &station_config,
        );

        run::spawn().ok();

        (Shared {}, Local { station })
    }

    /// Control loop: clock-set at boot, then sample, log and display
    #[task(priority = 1, local = [station])]
    async fn run(cx: run::Context) {
        let station = cx.local.station;

        if let Err(e) = station.start() {
            error!("Startup clock-set failed: {}", e);
        }
        info!("Running, timezone {}", station.timezone().rules());

        loop {
            if station.tick() == Step::ClockSetRequested {
                match station.await_clock_set() {
                    Ok(_) => info!("Clock set by operator"),
                    Err(e) => warn!("Clock-set aborted: {}", e),
                }
            }
            Mono::delay(TICK_MS.millis()).await;
        }
    }
}
