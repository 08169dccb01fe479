use tracing::{trace, warn};

use crate::{
    Bar, Bb, BbConfig, Cmf, CmfConfig, Dmi, DmiConfig, Ema, EmaConfig, EnrichedRow, Error,
    Ichimoku, Kd, KdConfig, Macd, Mfi, MfiConfig, Obv, ObvConfig, Ohlcv,
    PipelineConfig, Rsi, RsiConfig, Sample, Sma, SmaConfig, Timestamp,
};

/// Incremental indicator computation over one bar series.
///
/// Owns an independent state for every configured indicator. Each bar goes
/// to every indicator exactly once, in order, so appending bars one by one
/// gives the same rows as [`compute_indicators`] over the whole series.
///
/// ```
/// use barlens_ta::{Bar, Pipeline, PipelineConfig};
///
/// let mut pipeline = Pipeline::new(&PipelineConfig::default());
///
/// let row = pipeline.append(&Bar::new(1, 10.0, 11.0, 9.0, 10.5, 1000.0)).unwrap();
/// assert_eq!(row.obv, Some(1000.0));
/// assert_eq!(row.ma(5), None);
///
/// // Timestamps must advance
/// assert!(pipeline.append(&Bar::new(1, 10.0, 11.0, 9.0, 10.5, 1000.0)).is_err());
/// assert!(pipeline.append(&Bar::new(2, 10.5, 12.0, 10.0, 11.5, 800.0)).is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Pipeline {
    ma: Vec<(usize, Sma)>,
    volume_ma: Vec<(usize, Sma)>,
    boll: Option<Bb>,
    kd: Option<Kd>,
    rsi: Vec<(usize, Rsi)>,
    mfi: Option<Mfi>,
    macd: Option<Macd>,
    obv: Option<Obv>,
    obv_ema: Option<Ema>,
    cmf: Option<Cmf>,
    cmf_ema: Option<Ema>,
    dmi: Option<Dmi>,
    ichimoku: Option<Ichimoku>,
    last_open_time: Option<Timestamp>,
    appended: usize,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        let obv = config.obv.then(|| Obv::new(ObvConfig::default()));
        let cmf = config.cmf.map(|length| Cmf::new(CmfConfig::new(length)));

        Self {
            ma: config
                .ma
                .iter()
                .map(|&length| (length.get(), Sma::new(SmaConfig::close(length))))
                .collect(),
            volume_ma: config
                .volume_ma
                .iter()
                .map(|&length| (length.get(), Sma::new(SmaConfig::volume(length))))
                .collect(),
            boll: config.boll.map(|length| Bb::new(BbConfig::close(length))),
            kd: config.kd.map(|length| Kd::new(KdConfig::new(length))),
            rsi: config
                .rsi
                .iter()
                .map(|&length| (length.get(), Rsi::new(RsiConfig::close(length))))
                .collect(),
            mfi: config.mfi.map(|length| Mfi::new(MfiConfig::new(length))),
            macd: config.macd.map(|lengths| Macd::new(lengths.into())),
            obv_ema: config
                .obv_ema
                .filter(|_| obv.is_some())
                .map(|length| Ema::new(EmaConfig::close(length))),
            obv,
            cmf_ema: config
                .cmf_ema
                .filter(|_| cmf.is_some())
                .map(|length| Ema::new(EmaConfig::close(length))),
            cmf,
            dmi: config.dmi.map(|length| Dmi::new(DmiConfig::new(length))),
            ichimoku: config.ichimoku.map(|lengths| Ichimoku::new(lengths.into())),
            last_open_time: None,
            appended: 0,
        }
    }

    /// Number of bars accepted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.appended
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }

    /// Feeds the next bar to every indicator and returns its row.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedSequence`] when `bar` does not open strictly after
    /// the previous bar. The pipeline is left untouched and keeps accepting
    /// valid bars.
    pub fn append(&mut self, bar: &impl Ohlcv) -> Result<EnrichedRow, Error> {
        let time = bar.open_time();

        if let Some(previous) = self.last_open_time
            && time <= previous
        {
            let error = Error::MalformedSequence {
                index: self.appended,
                previous,
                current: time,
            };
            warn!(%error, "rejected bar");
            return Err(error);
        }

        self.last_open_time = Some(time);
        self.appended += 1;

        let row = self.feed(bar);
        trace!(time, index = self.appended - 1, trend = %row.trend, "appended bar");
        Ok(row)
    }

    fn feed(&mut self, bar: &impl Ohlcv) -> EnrichedRow {
        let time = bar.open_time();
        let mut row = EnrichedRow::new(Bar::from_ohlcv(bar));

        row.ma = self
            .ma
            .iter_mut()
            .map(|(length, sma)| (*length, sma.compute(bar)))
            .collect();
        row.volume_ma = self
            .volume_ma
            .iter_mut()
            .map(|(length, sma)| (*length, sma.compute(bar)))
            .collect();
        row.rsi = self
            .rsi
            .iter_mut()
            .map(|(length, rsi)| (*length, rsi.compute(bar)))
            .collect();

        row.boll = self.boll.as_mut().and_then(|bb| bb.compute(bar));
        row.kd = self.kd.as_mut().and_then(|kd| kd.compute(bar));
        row.mfi = self.mfi.as_mut().and_then(|mfi| mfi.compute(bar));
        row.macd = self.macd.as_mut().and_then(|macd| macd.compute(bar));
        row.dmi = self.dmi.as_mut().and_then(|dmi| dmi.compute(bar));
        row.ichimoku = self.ichimoku.as_mut().and_then(|ichimoku| ichimoku.compute(bar));

        row.obv = self.obv.as_mut().and_then(|obv| obv.compute(bar));
        row.obv_ema = chain(&mut self.obv_ema, time, row.obv);

        row.cmf = self.cmf.as_mut().and_then(|cmf| cmf.compute(bar));
        row.cmf_ema = chain(&mut self.cmf_ema, time, row.cmf);

        row.classify_trend();
        row
    }
}

/// Runs a derived EMA over another indicator's output.
///
/// The EMA only sees bars where the input exists, so it seeds on the input's
/// first value.
fn chain(ema: &mut Option<Ema>, time: Timestamp, input: Option<f64>) -> Option<f64> {
    let ema = ema.as_mut()?;
    match input {
        Some(value) => ema.compute(&Sample::new(time, value)),
        None => ema.value(),
    }
}

/// Checks that open times strictly increase.
///
/// # Errors
///
/// [`Error::MalformedSequence`] naming the first offending bar.
pub fn validate_sequence(bars: &[impl Ohlcv]) -> Result<(), Error> {
    bars.windows(2)
        .enumerate()
        .find(|(_, pair)| pair[1].open_time() <= pair[0].open_time())
        .map_or(Ok(()), |(i, pair)| {
            Err(Error::MalformedSequence {
                index: i + 1,
                previous: pair[0].open_time(),
                current: pair[1].open_time(),
            })
        })
}

/// Computes every configured indicator over a whole series from scratch.
///
/// The sequence is validated before any indicator runs. Empty input gives
/// empty output.
///
/// # Errors
///
/// [`Error::MalformedSequence`] when open times do not strictly increase.
pub fn compute_indicators(
    bars: &[impl Ohlcv],
    config: &PipelineConfig,
) -> Result<Vec<EnrichedRow>, Error> {
    if let Err(error) = validate_sequence(bars) {
        warn!(%error, "rejected bar series");
        return Err(error);
    }

    let mut pipeline = Pipeline::new(config);
    bars.iter().map(|bar| pipeline.append(bar)).collect()
}
