//! Patient characteristics and their numeric model encoding.
//!
//! Every categorical field is a closed enumeration, so a value outside the
//! trained domain cannot be constructed. `encode` is total and pure.

use serde::{Deserialize, Serialize};

/// Number of model input columns.
pub const FEATURE_COUNT: usize = 12;

/// Lower bound of the age-at-first-diagnosis input, in years.
pub const AGE_MIN: f64 = 0.0;

/// Upper bound of the age-at-first-diagnosis input, in years.
pub const AGE_MAX: f64 = 18.0;

/// A closed set of labelled choices with a fixed numeric code.
///
/// `OPTIONS` lists the choices in the order the form presents them; the
/// first option is the form default.
pub trait Categorical: Copy + PartialEq + 'static {
    /// All choices, in display order.
    const OPTIONS: &'static [Self];

    /// Label shown to the user.
    fn label(self) -> &'static str;

    /// Numeric code fed to the model.
    fn code(self) -> u8;

    /// Position of this choice within `OPTIONS`.
    fn position(self) -> usize {
        Self::OPTIONS
            .iter()
            .position(|o| *o == self)
            .unwrap_or_default()
    }

    /// Next choice, wrapping around.
    #[must_use]
    fn next(self) -> Self {
        let i = (self.position() + 1) % Self::OPTIONS.len();
        Self::OPTIONS[i]
    }

    /// Previous choice, wrapping around.
    #[must_use]
    fn prev(self) -> Self {
        let n = Self::OPTIONS.len();
        let i = (self.position() + n - 1) % n;
        Self::OPTIONS[i]
    }
}

/// Binary clinical finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    No,
    Yes,
}

impl Categorical for YesNo {
    const OPTIONS: &'static [Self] = &[Self::No, Self::Yes];

    fn label(self) -> &'static str {
        match self {
            Self::No => "No",
            Self::Yes => "Yes",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Female,
    Male,
}

impl Categorical for Gender {
    const OPTIONS: &'static [Self] = &[Self::Female, Self::Male];

    fn label(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
        }
    }
}

/// CKD stage at first diagnosis (KDIGO stages 1-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CkdStage {
    #[default]
    Stage1,
    Stage2,
    Stage3,
    Stage4,
    Stage5,
}

impl Categorical for CkdStage {
    const OPTIONS: &'static [Self] = &[
        Self::Stage1,
        Self::Stage2,
        Self::Stage3,
        Self::Stage4,
        Self::Stage5,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Stage1 => "1",
            Self::Stage2 => "2",
            Self::Stage3 => "3",
            Self::Stage4 => "4",
            Self::Stage5 => "5",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Stage1 => 1,
            Self::Stage2 => 2,
            Self::Stage3 => 3,
            Self::Stage4 => 4,
            Self::Stage5 => 5,
        }
    }
}

/// CAKUT sub-phenotype. Codes 1-7 are fixed by the trained models; adding a
/// category means retraining, not extending this enum at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CakutSubphenotype {
    #[default]
    RenalHypodysplasiaWithPuv,
    SolitaryKidney,
    BilateralRenalHypodysplasia,
    UnilateralRenalHypodysplasia,
    MulticysticDysplasticKidney,
    HorseshoeKidney,
    Others,
}

impl Categorical for CakutSubphenotype {
    const OPTIONS: &'static [Self] = &[
        Self::RenalHypodysplasiaWithPuv,
        Self::SolitaryKidney,
        Self::BilateralRenalHypodysplasia,
        Self::UnilateralRenalHypodysplasia,
        Self::MulticysticDysplasticKidney,
        Self::HorseshoeKidney,
        Self::Others,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::RenalHypodysplasiaWithPuv => "renal hypodysplasia associated with puv",
            Self::SolitaryKidney => "solitary kidney",
            Self::BilateralRenalHypodysplasia => "bilateral renal hypodysplasia",
            Self::UnilateralRenalHypodysplasia => "unilateral renal hypodysplasia",
            Self::MulticysticDysplasticKidney => "multicystic dysplastic kidney",
            Self::HorseshoeKidney => "horseshoe kidney",
            Self::Others => "others",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::RenalHypodysplasiaWithPuv => 1,
            Self::SolitaryKidney => 2,
            Self::BilateralRenalHypodysplasia => 3,
            Self::UnilateralRenalHypodysplasia => 4,
            Self::MulticysticDysplasticKidney => 5,
            Self::HorseshoeKidney => 6,
            Self::Others => 7,
        }
    }
}

impl CakutSubphenotype {
    /// Look up a sub-phenotype by its display label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::OPTIONS.iter().copied().find(|c| c.label() == label)
    }
}

/// Age at first diagnosis in years, always within `[AGE_MIN, AGE_MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct AgeYears(f64);

impl AgeYears {
    /// Accept a value only if it is finite and inside the input range.
    #[must_use]
    pub fn new(years: f64) -> Option<Self> {
        if years.is_finite() && (AGE_MIN..=AGE_MAX).contains(&years) {
            Some(Self(years))
        } else {
            None
        }
    }

    /// Clamp a value into the input range. Non-finite input maps to `AGE_MIN`.
    #[must_use]
    pub fn clamped(years: f64) -> Self {
        if years.is_finite() {
            Self(years.clamp(AGE_MIN, AGE_MAX))
        } else {
            Self(AGE_MIN)
        }
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

/// Immutable snapshot of everything the form collected.
///
/// `Default` reproduces the initial widget state: age 0 and the first option
/// of every selector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RawInputs {
    pub age_first_diagnose: AgeYears,
    pub gender: Gender,
    pub family_history: YesNo,
    pub ckd_stage_first_diagnose: CkdStage,
    pub short_stature: YesNo,
    pub cakut_subphenotype: CakutSubphenotype,
    pub pax2: YesNo,
    pub prenatal_phenotype: YesNo,
    pub congenital_heart_disease: YesNo,
    pub ocular: YesNo,
    pub preterm_birth: YesNo,
    pub behavioral_cognitive_abnormalities: YesNo,
}

/// Model input columns, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    AgeFirstDiagnose,
    Gender,
    FamilyHistory,
    CkdStageFirstDiagnose,
    ShortStature,
    CakutSubphenotype,
    Pax2,
    PrenatalPhenotype,
    CongenitalHeartDisease,
    Ocular,
    PretermBirth,
    BehavioralCognitiveAbnormalities,
}

impl Feature {
    /// Every column, in schema order. `ALL[i].index() == i`.
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::AgeFirstDiagnose,
        Self::Gender,
        Self::FamilyHistory,
        Self::CkdStageFirstDiagnose,
        Self::ShortStature,
        Self::CakutSubphenotype,
        Self::Pax2,
        Self::PrenatalPhenotype,
        Self::CongenitalHeartDisease,
        Self::Ocular,
        Self::PretermBirth,
        Self::BehavioralCognitiveAbnormalities,
    ];

    /// Position in the schema.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Schema field name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AgeFirstDiagnose => "age_first_diagnose",
            Self::Gender => "gender",
            Self::FamilyHistory => "family_history",
            Self::CkdStageFirstDiagnose => "ckd_stage_first_diagnose",
            Self::ShortStature => "short_stature",
            Self::CakutSubphenotype => "cakut_subphenotype",
            Self::Pax2 => "PAX2",
            Self::PrenatalPhenotype => "prenatal_phenotype",
            Self::CongenitalHeartDisease => "congenital_heart_disease",
            Self::Ocular => "ocular",
            Self::PretermBirth => "preterm_birth",
            Self::BehavioralCognitiveAbnormalities => "behavioral_cognitive_abnormalities",
        }
    }

    /// Column label used in the training data frame. Binary columns carry a
    /// `(1/0)` suffix there.
    #[must_use]
    pub fn training_column(self) -> &'static str {
        match self {
            Self::AgeFirstDiagnose => "age_first_diagnose",
            Self::Gender => "gender (1/0)",
            Self::FamilyHistory => "family_history (1/0)",
            Self::CkdStageFirstDiagnose => "ckd_stage_first_diagnose",
            Self::ShortStature => "short_stature (1/0)",
            Self::CakutSubphenotype => "cakut_subphenotype",
            Self::Pax2 => "PAX2",
            Self::PrenatalPhenotype => "prenatal_phenotype (1/0)",
            Self::CongenitalHeartDisease => "congenital_heart_disease (1/0)",
            Self::Ocular => "ocular (1/0)",
            Self::PretermBirth => "preterm_birth (1/0)",
            Self::BehavioralCognitiveAbnormalities => "behavioral_cognitive_abnormalities (1/0)",
        }
    }

    /// Form label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AgeFirstDiagnose => "Age At First Diagnose(yr)",
            Self::Gender => "Gender",
            Self::FamilyHistory => "Family history",
            Self::CkdStageFirstDiagnose => "CKD Stage At First Diagnose",
            Self::ShortStature => "Short Stature",
            Self::CakutSubphenotype => "CAKUT Subphenotype",
            Self::Pax2 => "PAX2",
            Self::PrenatalPhenotype => "Prenatal Phenotype",
            Self::CongenitalHeartDisease => "Congenital Heart Disease",
            Self::Ocular => "Ocular",
            Self::PretermBirth => "Preterm Birth",
            Self::BehavioralCognitiveAbnormalities => "Behavioral Cognitive Abnormalities",
        }
    }

    /// Resolve a model column name, accepting either the schema name or the
    /// training column label.
    #[must_use]
    pub fn from_column_name(column: &str) -> Option<Self> {
        let column = column.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == column || f.training_column() == column)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One encoded model input row, values in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRow {
    /// Build a row from values already in schema order.
    #[must_use]
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Values in schema order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// `(feature, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(|f| (*f, self.values[f.index()]))
    }
}

/// Encode a form snapshot into the model's numeric schema.
#[must_use]
pub fn encode(raw: &RawInputs) -> FeatureRow {
    let code = |c: u8| f64::from(c);
    FeatureRow::from_values([
        raw.age_first_diagnose.get(),
        code(raw.gender.code()),
        code(raw.family_history.code()),
        code(raw.ckd_stage_first_diagnose.code()),
        code(raw.short_stature.code()),
        code(raw.cakut_subphenotype.code()),
        code(raw.pax2.code()),
        code(raw.prenatal_phenotype.code()),
        code(raw.congenital_heart_disease.code()),
        code(raw.ocular.code()),
        code(raw.preterm_birth.code()),
        code(raw.behavioral_cognitive_abnormalities.code()),
    ])
}
