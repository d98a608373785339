use crate::{
    pipeline::Pipeline,
    traits::{ImagePreprocessor, RegionLabeller, ContourExtractor, ShapePostProcessor},
    algorithms::{
        ConnectedRegionLabeller,
        ImageprocContourExtractor,
        ThresholdPreprocessor,
        DouglasPeuckerSimplifier,
        VisvalingamWhyattSimplifier,
        GeometryValidator,
        MinimumAreaFilter,
    },
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    labeller: Option<Box<dyn RegionLabeller>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    postprocessors: Vec<Box<dyn ShapePostProcessor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            labeller: None,
            contour_extractor: None,
            postprocessors: Vec::new(),
        }
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the region labeller (replaces any existing one)
    pub fn set_labeller<L>(mut self, labeller: L) -> Self
    where
        L: RegionLabeller + 'static,
    {
        self.labeller = Some(Box::new(labeller));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Add a post-processor to the pipeline
    pub fn add_postprocessor<P>(mut self, postprocessor: P) -> Self
    where
        P: ShapePostProcessor + 'static,
    {
        self.postprocessors.push(Box::new(postprocessor));
        self
    }

    /// Drop outlines of regions of at most `min_area` pixels
    pub fn with_min_region_area(self, min_area: u64) -> Self {
        self.add_postprocessor(MinimumAreaFilter { min_area })
    }

    /// Add Douglas-Peucker simplification as a post-processing step
    pub fn with_simplification(self, tolerance: f32) -> Self {
        let simplifier = SimplificationProcessor::new(tolerance, SimplificationMethod::DouglasPeucker);
        self.add_postprocessor(simplifier)
    }

    /// Add Visvalingam-Whyatt simplification as a post-processing step
    pub fn with_vw_simplification(self, tolerance: f32) -> Self {
        let simplifier = SimplificationProcessor::new(tolerance, SimplificationMethod::VisvalingamWhyatt);
        self.add_postprocessor(simplifier)
    }

    /// Add geometry validation as a post-processing step
    pub fn with_validation(self) -> Self {
        self.add_postprocessor(GeometryValidator)
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let labeller = self.labeller
            .unwrap_or_else(|| Box::new(ConnectedRegionLabeller::default()));

        let contour_extractor = self.contour_extractor
            .unwrap_or_else(|| Box::new(ImageprocContourExtractor));

        Pipeline::new(
            self.preprocessors,
            labeller,
            contour_extractor,
            self.postprocessors,
        )
    }

    /// Pipeline for compositor instance masks: binarize, drop specks,
    /// simplify, then guarantee every remaining outline is a valid polygon.
    pub fn build_for_instance_masks(min_region_area: u64, tolerance: f32) -> Pipeline {
        let builder = Self::new()
            .add_preprocessor(ThresholdPreprocessor::default())
            .with_min_region_area(min_region_area);

        let builder = if tolerance > 0.0 {
            builder.with_simplification(tolerance)
        } else {
            builder
        };

        builder.with_validation().build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Simplification method enum
#[derive(Debug, Clone)]
enum SimplificationMethod {
    DouglasPeucker,
    VisvalingamWhyatt,
}

/// Wrapper to use ShapeSimplifier as ShapePostProcessor
struct SimplificationProcessor {
    tolerance: f32,
    method: SimplificationMethod,
}

impl SimplificationProcessor {
    fn new(tolerance: f32, method: SimplificationMethod) -> Self {
        Self {
            tolerance,
            method,
        }
    }
}

impl ShapePostProcessor for SimplificationProcessor {
    fn process(&self, regions: &mut [crate::types::RegionOutline]) -> crate::error::Result<()> {
        use crate::traits::ShapeSimplifier;

        match self.method {
            SimplificationMethod::DouglasPeucker => {
                DouglasPeuckerSimplifier.simplify(regions, self.tolerance)
            }
            SimplificationMethod::VisvalingamWhyatt => {
                VisvalingamWhyattSimplifier.simplify(regions, self.tolerance)
            }
        }
    }
}
